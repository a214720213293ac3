//! Size classes for units, bucketed by population.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::EmployerTaxonomy;

/// Entity types that carry population bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Municipal,
    County,
    Township,
}

impl EntityType {
    /// Case-insensitive match on a taxonomy's `entity_type`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "municipal" => Some(EntityType::Municipal),
            "county" => Some(EntityType::County),
            "township" => Some(EntityType::Township),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SizeClass::Small => "Small",
            SizeClass::Medium => "Medium",
            SizeClass::Large => "Large",
        })
    }
}

/// Population bounds for one (entity type, special) bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeBounds {
    /// Chicago is large regardless of population.
    AlwaysLarge,
    /// Medium from `lower` thousand residents, large from `upper` thousand.
    Thousands { lower: i64, upper: i64 },
}

const SIZE_BOUNDS: [(EntityType, bool, SizeBounds); 6] = [
    (EntityType::Municipal, true, SizeBounds::AlwaysLarge),
    (
        EntityType::Municipal,
        false,
        SizeBounds::Thousands { lower: 10, upper: 50 },
    ),
    (
        EntityType::County,
        true,
        SizeBounds::Thousands {
            lower: 500,
            upper: 1000,
        },
    ),
    (
        EntityType::County,
        false,
        SizeBounds::Thousands { lower: 25, upper: 75 },
    ),
    (
        EntityType::Township,
        true,
        SizeBounds::Thousands {
            lower: 25,
            upper: 100,
        },
    ),
    (
        EntityType::Township,
        false,
        SizeBounds::Thousands { lower: 10, upper: 50 },
    ),
];

pub fn size_bounds(kind: EntityType, special: bool) -> SizeBounds {
    SIZE_BOUNDS
        .iter()
        .find(|(k, s, _)| *k == kind && *s == special)
        .map(|(_, _, bounds)| *bounds)
        // Every (kind, special) pair is in the table.
        .unwrap_or(SizeBounds::AlwaysLarge)
}

impl SizeBounds {
    pub fn classify(&self, population: i64) -> SizeClass {
        match *self {
            SizeBounds::AlwaysLarge => SizeClass::Large,
            SizeBounds::Thousands { lower, upper } => {
                if population >= upper * 1000 {
                    SizeClass::Large
                } else if population >= lower * 1000 {
                    SizeClass::Medium
                } else {
                    SizeClass::Small
                }
            }
        }
    }
}

/// Size class of a unit, or `None` without a taxonomy, a population reading,
/// or an entity type outside the bounds table.
pub fn size_class(taxonomy: Option<&EmployerTaxonomy>, population: Option<i64>) -> Option<SizeClass> {
    let taxonomy = taxonomy?;
    let population = population?;
    let kind = taxonomy.kind()?;

    Some(size_bounds(kind, taxonomy.is_special()).classify(population))
}
