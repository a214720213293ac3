//! Peer groups for salary comparisons.
//!
//! Units are compared with every unit sharing their taxonomy; a unit's pool
//! includes the salaries of those units' departments. Departments are
//! compared with departments of the same universe whose parent units share
//! this department's parent taxonomy.
//!
//! Membership is precomputed per employer in a [`ComparisonIndex`] so that
//! filtering a year's salaries is one map lookup per salary.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Employer, EmployerId, TaxonomyId, UniverseId};
use crate::payroll::Payroll;

/// A resolved peer group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ComparisonGroup {
    /// Units of one taxonomy, departments rolled into their unit.
    #[serde(rename_all = "camelCase")]
    Taxonomy { taxonomy_id: TaxonomyId },
    /// Departments of one universe under units of one taxonomy.
    #[serde(rename_all = "camelCase")]
    Universe {
        universe_id: UniverseId,
        parent_taxonomy_id: TaxonomyId,
    },
}

/// Whether an employer can be compared with its peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparability {
    Comparable(ComparisonGroup),
    /// The employer itself is unclassified.
    NotApplicable,
    /// A classified department whose parent unit is unclassified.
    NoData,
}

impl Comparability {
    pub fn is_comparable(&self) -> bool {
        matches!(self, Comparability::Comparable(_))
    }

    pub fn group(&self) -> Option<ComparisonGroup> {
        match self {
            Comparability::Comparable(group) => Some(*group),
            _ => None,
        }
    }
}

/// Resolves the peer group of `employer`.
pub fn resolve(payroll: &Payroll, employer: &Employer) -> Comparability {
    if employer.is_unclassified() {
        return Comparability::NotApplicable;
    }

    match (employer.parent_id, employer.taxonomy_id, employer.universe_id) {
        (None, Some(taxonomy_id), _) => {
            Comparability::Comparable(ComparisonGroup::Taxonomy { taxonomy_id })
        }
        (Some(_), _, Some(universe_id)) => {
            match payroll.parent(employer).and_then(|p| p.taxonomy_id) {
                Some(parent_taxonomy_id) => Comparability::Comparable(ComparisonGroup::Universe {
                    universe_id,
                    parent_taxonomy_id,
                }),
                None => Comparability::NoData,
            }
        }
        _ => Comparability::NotApplicable,
    }
}

/// Comparison keys of one employer row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PeerKeys {
    /// Taxonomy of the employer, or of its parent for a department.
    rollup_taxonomy: Option<TaxonomyId>,
    /// Universe and parent taxonomy, for classified departments only.
    universe: Option<(UniverseId, TaxonomyId)>,
}

/// Employer id → peer-group keys, built once per snapshot.
#[derive(Debug, Clone, Default)]
pub struct ComparisonIndex {
    keys: HashMap<EmployerId, PeerKeys>,
}

impl ComparisonIndex {
    pub fn build(payroll: &Payroll) -> Self {
        let keys = payroll
            .employers()
            .map(|employer| {
                let unit = payroll.parent(employer).unwrap_or(employer);
                let rollup_taxonomy = unit.taxonomy_id;
                let universe = if employer.is_department() {
                    employer.universe_id.zip(rollup_taxonomy)
                } else {
                    None
                };
                (
                    employer.id,
                    PeerKeys {
                        rollup_taxonomy,
                        universe,
                    },
                )
            })
            .collect();

        Self { keys }
    }

    /// Whether salaries at `employer_id` belong to `group`'s pool.
    pub fn belongs_to(&self, employer_id: EmployerId, group: ComparisonGroup) -> bool {
        let Some(keys) = self.keys.get(&employer_id) else {
            return false;
        };
        match group {
            ComparisonGroup::Taxonomy { taxonomy_id } => {
                keys.rollup_taxonomy == Some(taxonomy_id)
            }
            ComparisonGroup::Universe {
                universe_id,
                parent_taxonomy_id,
            } => keys.universe == Some((universe_id, parent_taxonomy_id)),
        }
    }

    /// Number of employers in `group`.
    pub fn member_count(&self, group: ComparisonGroup) -> usize {
        self.keys
            .keys()
            .filter(|id| self.belongs_to(**id, group))
            .count()
    }
}
