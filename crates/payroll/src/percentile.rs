//! Percentile ranks of salaries within one reporting year.
//!
//! A salary is ranked by total pay (amount plus extra pay) against two
//! populations: its own employer group and its peer group from
//! [`crate::comparison`]. The employer group of a unit or of any of its
//! departments is the unit plus all its departments, so a department salary
//! ranks alongside its sibling departments.
//!
//! The rank of value `v` in a population of `N` is
//! `(count of values <= v - 1) / (N - 1)`, so tied salaries share the rank
//! of the highest position among them and the top value ranks 100. A
//! population of one ranks its only value at 100.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Serialize, Serializer};

use crate::comparison::{self, Comparability, ComparisonGroup, ComparisonIndex};
use crate::error::PercentileError;
use crate::model::{EmployerId, Money, SalaryId};
use crate::payroll::Payroll;

/// Outcome of a percentile query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percentile {
    /// Rank scaled to `0.0..=100.0`.
    Rank(f64),
    /// The employer has no classification to compare by.
    NotApplicable,
    /// The employer is classified but its parent unit is not.
    NoData,
}

impl Percentile {
    pub fn value(&self) -> Option<f64> {
        match self {
            Percentile::Rank(value) => Some(*value),
            _ => None,
        }
    }
}

impl Serialize for Percentile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Percentile::Rank(value) => serializer.serialize_f64(*value),
            Percentile::NotApplicable => serializer.serialize_str("N/A"),
            Percentile::NoData => serializer.serialize_none(),
        }
    }
}

impl From<Comparability> for Percentile {
    /// The sentinel for an employer that cannot be compared.
    fn from(comparability: Comparability) -> Self {
        match comparability {
            Comparability::NoData => Percentile::NoData,
            _ => Percentile::NotApplicable,
        }
    }
}

/// Total pay values of one population, sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPopulation {
    year: i32,
    sorted: Vec<Money>,
}

impl RankedPopulation {
    pub fn new<I>(year: i32, values: I) -> Self
    where
        I: IntoIterator<Item = Money>,
    {
        let mut sorted: Vec<Money> = values.into_iter().collect();
        sorted.sort_unstable();
        Self { year, sorted }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Rank of `value` as a fraction in `0.0..=1.0`.
    pub fn percent_rank(&self, value: Money) -> Result<f64, PercentileError> {
        let n = self.sorted.len();
        match n {
            0 => Err(PercentileError::EmptyPopulation { year: self.year }),
            1 => Ok(1.0),
            _ => {
                let at_or_below = self.sorted.partition_point(|v| *v <= value);
                Ok(at_or_below.saturating_sub(1) as f64 / (n - 1) as f64)
            }
        }
    }

    /// Rank of `value` scaled to `0.0..=100.0`.
    pub fn percentile(&self, value: Money) -> Result<f64, PercentileError> {
        self.percent_rank(value).map(|rank| rank * 100.0)
    }

    pub fn total(&self) -> Money {
        self.sorted.iter().copied().sum()
    }

    /// Lower median for even-sized populations.
    pub fn median(&self) -> Option<Money> {
        if self.sorted.is_empty() {
            return None;
        }
        Some(self.sorted[(self.sorted.len() - 1) / 2])
    }
}

/// Both ranks of one salary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryPercentiles {
    pub salary_id: SalaryId,
    pub year: i32,
    pub total_pay: Money,
    pub employer_percentile: Percentile,
    pub like_employer_percentile: Percentile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PoolKey {
    /// A unit and all its departments.
    EmployerGroup(EmployerId),
    /// One employer's own staff.
    Staff(EmployerId),
    Peers(ComparisonGroup),
}

/// Ranks salaries against a [`Payroll`] snapshot.
///
/// Populations are built on first use and cached per (pool, year); the
/// snapshot never changes, so cached populations never go stale.
pub struct PercentileEngine {
    payroll: Arc<Payroll>,
    index: ComparisonIndex,
    pools: RwLock<HashMap<(PoolKey, i32), Arc<RankedPopulation>>>,
}

impl PercentileEngine {
    pub fn new(payroll: Arc<Payroll>) -> Self {
        let index = ComparisonIndex::build(&payroll);
        Self {
            payroll,
            index,
            pools: RwLock::new(HashMap::new()),
        }
    }

    pub fn payroll(&self) -> &Payroll {
        &self.payroll
    }

    pub fn comparability(&self, employer_id: EmployerId) -> Result<Comparability, PercentileError> {
        let employer = self
            .payroll
            .employer(employer_id)
            .ok_or(PercentileError::UnknownEmployer(employer_id))?;
        Ok(comparison::resolve(&self.payroll, employer))
    }

    /// The unit whose group `employer_id` ranks in: itself for a unit, its
    /// parent for a department.
    pub fn group_unit(&self, employer_id: EmployerId) -> Result<EmployerId, PercentileError> {
        self.payroll
            .employer(employer_id)
            .map(|employer| employer.parent_id.unwrap_or(employer.id))
            .ok_or(PercentileError::UnknownEmployer(employer_id))
    }

    /// Salaries in `year` across the employer group of `employer_id`: the
    /// unit (or the department's parent unit) and all its departments.
    pub fn employer_population(
        &self,
        employer_id: EmployerId,
        year: i32,
    ) -> Result<Arc<RankedPopulation>, PercentileError> {
        let unit_id = self.group_unit(employer_id)?;

        Ok(self.pool(PoolKey::EmployerGroup(unit_id), year, |salary_employer| {
            self.group_unit(salary_employer)
                .is_ok_and(|salary_unit| salary_unit == unit_id)
        }))
    }

    /// Salaries in `year` at exactly `employer_id`, without departments.
    pub fn staff_population(
        &self,
        employer_id: EmployerId,
        year: i32,
    ) -> Result<Arc<RankedPopulation>, PercentileError> {
        self.group_unit(employer_id)?;
        Ok(self.pool(PoolKey::Staff(employer_id), year, |salary_employer| {
            salary_employer == employer_id
        }))
    }

    /// Salaries in `year` at employers belonging to `group`.
    pub fn peer_population(&self, group: ComparisonGroup, year: i32) -> Arc<RankedPopulation> {
        self.pool(PoolKey::Peers(group), year, |salary_employer| {
            self.index.belongs_to(salary_employer, group)
        })
    }

    fn pool<F>(&self, key: PoolKey, year: i32, includes: F) -> Arc<RankedPopulation>
    where
        F: Fn(EmployerId) -> bool,
    {
        let cached = match self.pools.read() {
            Ok(pools) => pools.get(&(key, year)).cloned(),
            Err(poisoned) => {
                log::warn!("Percentile pool cache lock was poisoned, recovering");
                poisoned.into_inner().get(&(key, year)).cloned()
            }
        };
        if let Some(population) = cached {
            return population;
        }

        let _span = tracing::debug_span!("percentile.build_pool", ?key, year).entered();
        let population = Arc::new(RankedPopulation::new(
            year,
            self.payroll
                .salaries_in_year(year)
                .filter(|s| {
                    self.payroll
                        .salary_employer_id(s)
                        .is_some_and(|employer_id| includes(employer_id))
                })
                .map(|s| s.total_pay()),
        ));
        log::debug!(
            "Built {:?} population for {} with {} salaries",
            key,
            year,
            population.len()
        );

        let mut pools = match self.pools.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Percentile pool cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        pools.entry((key, year)).or_insert(population).clone()
    }

    /// Year, employer and total pay of a stored salary.
    fn locate(&self, salary_id: SalaryId) -> Result<(i32, EmployerId, Money), PercentileError> {
        let salary = self
            .payroll
            .salary(salary_id)
            .ok_or(PercentileError::UnknownSalary(salary_id))?;
        let year = self
            .payroll
            .reporting_year(salary.vintage_id)
            .ok_or(PercentileError::UnknownVintage(salary.vintage_id))?;
        let employer_id = self
            .payroll
            .salary_employer_id(salary)
            .ok_or(PercentileError::UnknownSalary(salary_id))?;
        Ok((year, employer_id, salary.total_pay()))
    }

    /// Rank of a salary among all salaries in its employer group that year.
    pub fn employer_percentile(&self, salary_id: SalaryId) -> Result<Percentile, PercentileError> {
        let (year, employer_id, total_pay) = self.locate(salary_id)?;
        self.rank_at_employer(employer_id, year, total_pay)
    }

    /// Rank of a salary among salaries at comparable employers that year.
    pub fn like_employer_percentile(
        &self,
        salary_id: SalaryId,
    ) -> Result<Percentile, PercentileError> {
        let (year, employer_id, total_pay) = self.locate(salary_id)?;
        self.rank_among_peers(employer_id, year, total_pay)
    }

    pub fn salary_percentiles(
        &self,
        salary_id: SalaryId,
    ) -> Result<SalaryPercentiles, PercentileError> {
        let _span = tracing::info_span!("percentile.salary", salary_id).entered();
        let (year, employer_id, total_pay) = self.locate(salary_id)?;

        Ok(SalaryPercentiles {
            salary_id,
            year,
            total_pay,
            employer_percentile: self.rank_at_employer(employer_id, year, total_pay)?,
            like_employer_percentile: self.rank_among_peers(employer_id, year, total_pay)?,
        })
    }

    /// Where `value` would rank in the employer group of `employer_id` in
    /// `year`.
    pub fn rank_at_employer(
        &self,
        employer_id: EmployerId,
        year: i32,
        value: Money,
    ) -> Result<Percentile, PercentileError> {
        let population = self.employer_population(employer_id, year)?;
        Ok(Percentile::Rank(population.percentile(value)?))
    }

    /// Where `value` would rank among `employer_id`'s peers in `year`.
    pub fn rank_among_peers(
        &self,
        employer_id: EmployerId,
        year: i32,
        value: Money,
    ) -> Result<Percentile, PercentileError> {
        match self.comparability(employer_id)? {
            Comparability::Comparable(group) => {
                let population = self.peer_population(group, year);
                Ok(Percentile::Rank(population.percentile(value)?))
            }
            other => Ok(other.into()),
        }
    }
}
