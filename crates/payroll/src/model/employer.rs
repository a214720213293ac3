//! Employers and their classification axes.
//!
//! An employer without a parent is a *unit* (a city, county, township, ...).
//! An employer with a parent is a *department* of that unit. Units are
//! classified by [`EmployerTaxonomy`], departments by [`EmployerUniverse`];
//! the two axes are mutually exclusive.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{EmployerId, TaxonomyId, UniverseId, VintageId};
use crate::classification::EntityType;
use crate::error::ValidationError;

/// Classification of units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerTaxonomy {
    pub id: TaxonomyId,
    pub entity_type: String,
    pub chicago: bool,
    pub cook_or_collar: bool,
}

impl EmployerTaxonomy {
    /// True for Chicago or the Cook/collar county region.
    pub fn is_special(&self) -> bool {
        self.chicago || self.cook_or_collar
    }

    /// The entity type when it is one the size table knows about.
    pub fn kind(&self) -> Option<EntityType> {
        EntityType::parse(&self.entity_type)
    }
}

impl fmt::Display for EmployerTaxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.chicago {
            write!(f, "{} (Chicago)", self.entity_type)
        } else if self.cook_or_collar {
            write!(f, "{} (Cook or Collar)", self.entity_type)
        } else {
            write!(f, "{}", self.entity_type)
        }
    }
}

/// Functional classification of departments, e.g. "Police Department".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerUniverse {
    pub id: UniverseId,
    pub name: String,
}

impl fmt::Display for EmployerUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A stored employer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employer {
    pub id: EmployerId,
    pub vintage_id: VintageId,
    pub slug: String,
    pub name: String,
    pub parent_id: Option<EmployerId>,
    pub taxonomy_id: Option<TaxonomyId>,
    pub universe_id: Option<UniverseId>,
}

impl Employer {
    pub fn is_department(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn is_unit(&self) -> bool {
        self.parent_id.is_none()
    }

    /// A unit without a taxonomy, or a department without a universe.
    pub fn is_unclassified(&self) -> bool {
        if self.is_department() {
            self.universe_id.is_none()
        } else {
            self.taxonomy_id.is_none()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_axes(&self.name, self.parent_id, self.taxonomy_id, self.universe_id)
    }
}

/// An employer that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEmployer {
    pub vintage_id: VintageId,
    pub name: String,
    pub parent_id: Option<EmployerId>,
    pub taxonomy_id: Option<TaxonomyId>,
    pub universe_id: Option<UniverseId>,
}

impl NewEmployer {
    pub fn unit(vintage_id: VintageId, name: &str) -> Self {
        Self {
            vintage_id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn department(vintage_id: VintageId, name: &str, parent_id: EmployerId) -> Self {
        Self {
            vintage_id,
            name: name.to_string(),
            parent_id: Some(parent_id),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_axes(&self.name, self.parent_id, self.taxonomy_id, self.universe_id)
    }
}

fn validate_axes(
    name: &str,
    parent_id: Option<EmployerId>,
    taxonomy_id: Option<TaxonomyId>,
    universe_id: Option<UniverseId>,
) -> Result<(), ValidationError> {
    match (parent_id, taxonomy_id, universe_id) {
        (Some(_), Some(_), _) => Err(ValidationError::DepartmentWithTaxonomy {
            name: name.to_string(),
        }),
        (None, _, Some(_)) => Err(ValidationError::UnitWithUniverse {
            name: name.to_string(),
        }),
        _ => Ok(()),
    }
}

/// One population reading for an employer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerPopulation {
    pub employer_id: EmployerId,
    pub population: i64,
    pub data_year: i32,
}

/// The reading whose `data_year` is nearest to `year`; the earlier year wins
/// a tie.
pub fn closest_population(
    readings: &[EmployerPopulation],
    year: i32,
) -> Option<&EmployerPopulation> {
    readings
        .iter()
        .min_by_key(|p| ((p.data_year - year).abs(), p.data_year))
}
