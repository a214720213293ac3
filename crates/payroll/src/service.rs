//! Query service over a payroll database.
//!
//! Each reporting year gets its own [`PercentileEngine`] over a snapshot
//! loaded on first use. Imports drop the cached engine for the imported
//! year so the next query sees the new rows.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::classification::SizeClass;
use crate::comparison::{Comparability, ComparisonGroup};
use crate::db::compensation_repo::{self, JobListing};
use crate::db::{employer_repo, snapshot, vintage_repo, Database};
use crate::display::employer_display_name;
use crate::error::{PayrollError, Result};
use crate::ingest::{self, ImportSummary, StandardizedBatch};
use crate::model::{Employer, EmployerId, Money, SalaryId};
use crate::percentile::{Percentile, PercentileEngine, RankedPopulation, SalaryPercentiles};

/// An employer as shown on its profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerProfile {
    pub id: EmployerId,
    pub slug: String,
    pub name: String,
    pub year: i32,
    pub is_department: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EmployerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub universe: Option<String>,
    pub population: Option<i64>,
    pub size_class: Option<SizeClass>,
    pub comparable: bool,
    pub comparison_group: Option<ComparisonGroup>,
    pub headcount: usize,
    pub total_pay: Money,
    pub median_pay: Option<Money>,
    pub departments: Vec<DepartmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    pub id: EmployerId,
    pub slug: String,
    pub name: String,
    pub headcount: usize,
    pub total_pay: Money,
}

/// Aggregate figures for one reporting year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: i32,
    pub units: usize,
    pub departments: usize,
    pub people: usize,
    pub salaries: usize,
    pub total_pay: Money,
    pub median_pay: Option<Money>,
}

pub struct PayrollService {
    db: Database,
    engines: RwLock<HashMap<i32, Arc<PercentileEngine>>>,
}

impl PayrollService {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            engines: RwLock::new(HashMap::new()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn read_engines(&self) -> RwLockReadGuard<'_, HashMap<i32, Arc<PercentileEngine>>> {
        self.engines.read().unwrap_or_else(|poisoned| {
            log::warn!("Engine cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_engines(&self) -> RwLockWriteGuard<'_, HashMap<i32, Arc<PercentileEngine>>> {
        self.engines.write().unwrap_or_else(|poisoned| {
            log::warn!("Engine cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// The engine for `year`, loading its snapshot on first use.
    pub fn engine(&self, year: i32) -> Result<Arc<PercentileEngine>> {
        if let Some(engine) = self.read_engines().get(&year) {
            return Ok(Arc::clone(engine));
        }

        let payroll = self.db.with_conn(|conn| snapshot::load(conn, Some(year)))?;
        let engine = Arc::new(PercentileEngine::new(Arc::new(payroll)));
        log::info!("Loaded percentile engine for {}", year);

        Ok(Arc::clone(self.write_engines().entry(year).or_insert(engine)))
    }

    /// Reporting years with salaries, most recent first.
    pub fn years(&self) -> Result<Vec<i32>> {
        Ok(self.db.with_conn(vintage_repo::salary_years)?)
    }

    fn employer(&self, employer_id: EmployerId) -> Result<Employer> {
        self.db
            .with_conn(|conn| employer_repo::find_by_id(conn, employer_id))?
            .ok_or(PayrollError::NotFound {
                kind: "employer",
                id: employer_id,
            })
    }

    /// `year`, or the reporting year of the vintage that created the employer.
    fn year_or_vintage(&self, employer: &Employer, year: Option<i32>) -> Result<i32> {
        match year {
            Some(year) => Ok(year),
            None => self
                .db
                .with_conn(|conn| vintage_repo::reporting_year(conn, employer.vintage_id))?
                .ok_or(PayrollError::NotFound {
                    kind: "vintage",
                    id: employer.vintage_id,
                }),
        }
    }

    fn salary_year(&self, salary_id: SalaryId) -> Result<i32> {
        self.db
            .with_conn(|conn| compensation_repo::salary_year(conn, salary_id))?
            .ok_or(PayrollError::NotFound {
                kind: "salary",
                id: salary_id,
            })
    }

    /// Population nearest to `year` (or to the employer's own vintage year).
    pub fn get_population(&self, employer_id: EmployerId, year: Option<i32>) -> Result<Option<i64>> {
        let employer = self.employer(employer_id)?;
        let engine = self.engine(self.year_or_vintage(&employer, year)?)?;
        Ok(engine.payroll().get_population(employer_id, year))
    }

    pub fn size_class(&self, employer_id: EmployerId, year: Option<i32>) -> Result<Option<SizeClass>> {
        let employer = self.employer(employer_id)?;
        let engine = self.engine(self.year_or_vintage(&employer, year)?)?;
        Ok(engine.payroll().size_class(employer_id, year))
    }

    pub fn comparison(&self, employer_id: EmployerId) -> Result<Comparability> {
        let employer = self.employer(employer_id)?;
        let engine = self.engine(self.year_or_vintage(&employer, None)?)?;
        Ok(engine.comparability(employer_id)?)
    }

    pub fn is_comparable(&self, employer_id: EmployerId) -> Result<bool> {
        Ok(self.comparison(employer_id)?.is_comparable())
    }

    pub fn employer_percentile(&self, salary_id: SalaryId) -> Result<Percentile> {
        let engine = self.engine(self.salary_year(salary_id)?)?;
        Ok(engine.employer_percentile(salary_id)?)
    }

    pub fn like_employer_percentile(&self, salary_id: SalaryId) -> Result<Percentile> {
        let engine = self.engine(self.salary_year(salary_id)?)?;
        Ok(engine.like_employer_percentile(salary_id)?)
    }

    pub fn salary_percentiles(&self, salary_id: SalaryId) -> Result<SalaryPercentiles> {
        let engine = self.engine(self.salary_year(salary_id)?)?;
        Ok(engine.salary_percentiles(salary_id)?)
    }

    /// Profile of an employer in `year`; defaults to the latest year with
    /// salaries.
    pub fn employer_profile(
        &self,
        employer_id: EmployerId,
        year: Option<i32>,
    ) -> Result<EmployerProfile> {
        let employer = self.employer(employer_id)?;
        let year = match year {
            Some(year) => year,
            None => match self.years()?.first() {
                Some(latest) => *latest,
                None => self.year_or_vintage(&employer, None)?,
            },
        };

        let engine = self.engine(year)?;
        let payroll = engine.payroll();
        let employer = payroll.employer(employer_id).ok_or(PayrollError::NotFound {
            kind: "employer",
            id: employer_id,
        })?;
        let parent = payroll.parent(employer);
        let comparability = engine.comparability(employer_id)?;
        let population = if employer.is_unit() {
            engine.employer_population(employer_id, year)?
        } else {
            engine.staff_population(employer_id, year)?
        };

        let departments = payroll
            .departments(employer_id)
            .map(|department| -> Result<DepartmentSummary> {
                let pool = engine.staff_population(department.id, year)?;
                Ok(DepartmentSummary {
                    id: department.id,
                    slug: department.slug.clone(),
                    name: employer_display_name(&department.name, Some(&employer.name)),
                    headcount: pool.len(),
                    total_pay: pool.total(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(EmployerProfile {
            id: employer.id,
            slug: employer.slug.clone(),
            name: employer_display_name(&employer.name, parent.map(|p| p.name.as_str())),
            year,
            is_department: employer.is_department(),
            parent_id: employer.parent_id,
            taxonomy: payroll.employer_taxonomy(employer).map(|t| t.to_string()),
            universe: payroll.employer_universe(employer).map(|u| u.name.clone()),
            population: payroll.get_population(employer_id, Some(year)),
            size_class: payroll.size_class(employer_id, Some(year)),
            comparable: comparability.is_comparable(),
            comparison_group: comparability.group(),
            headcount: population.len(),
            total_pay: population.total(),
            median_pay: population.median(),
            departments,
        })
    }

    /// Highest-paid jobs at an employer in `year`.
    pub fn jobs_of_employer(
        &self,
        employer_id: EmployerId,
        year: i32,
        limit: usize,
    ) -> Result<Vec<JobListing>> {
        Ok(self.db.with_conn(|conn| {
            compensation_repo::jobs_of_employer(conn, employer_id, year, limit)
        })?)
    }

    pub fn year_summary(&self, year: i32) -> Result<YearSummary> {
        let engine = self.engine(year)?;
        let payroll = engine.payroll();

        let mut units = BTreeSet::new();
        let mut departments = BTreeSet::new();
        let mut people = BTreeSet::new();
        let mut totals = Vec::new();

        for salary in payroll.salaries_in_year(year) {
            totals.push(salary.total_pay());
            if let Some(job) = payroll.job(salary.job_id) {
                people.insert(job.person_id);
            }
            if let Some(employer) = payroll.salary_employer(salary) {
                match employer.parent_id {
                    Some(parent_id) => {
                        units.insert(parent_id);
                        departments.insert(employer.id);
                    }
                    None => {
                        units.insert(employer.id);
                    }
                }
            }
        }

        let population = RankedPopulation::new(year, totals);
        Ok(YearSummary {
            year,
            units: units.len(),
            departments: departments.len(),
            people: people.len(),
            salaries: population.len(),
            total_pay: population.total(),
            median_pay: population.median(),
        })
    }

    /// Imports a batch and drops every cached engine.
    ///
    /// Snapshots of any year carry all employers, so an import for one year
    /// makes the other years' engines stale too.
    pub fn import(&self, batch: &StandardizedBatch) -> Result<ImportSummary> {
        let summary = ingest::import_batch(&self.db, batch)?;
        let mut engines = self.write_engines();
        if !engines.is_empty() {
            log::debug!(
                "Invalidated {} cached percentile engine(s) after importing {}",
                engines.len(),
                summary.reporting_year
            );
            engines.clear();
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::StandardizedRecord;

    fn record(employer: &str, department: Option<&str>, name: &str, dollars: i64) -> StandardizedRecord {
        StandardizedRecord {
            employer: employer.to_string(),
            department: department.map(str::to_string),
            title: "CLERK".to_string(),
            first_name: Some(name.to_string()),
            last_name: Some("SMITH".to_string()),
            salary: Some(Money::from_dollars(dollars)),
            extra_pay: None,
            date_started: None,
        }
    }

    fn batch(year: i32, records: Vec<StandardizedRecord>) -> StandardizedBatch {
        StandardizedBatch {
            reporting_year: year,
            file_name: format!("{}.json", year),
            responding_agency: None,
            created_by: None,
            records,
        }
    }

    fn service() -> PayrollService {
        let service = PayrollService::new(Database::open_in_memory().unwrap());
        service
            .import(&batch(
                2017,
                vec![
                    record("OAK PARK", None, "ANN", 30_000),
                    record("OAK PARK", Some("POLICE"), "BOB", 45_000),
                    record("OAK PARK", Some("POLICE"), "CY", 45_000),
                    record("OAK PARK", Some("FIRE"), "DOT", 90_000),
                ],
            ))
            .unwrap();
        service
    }

    fn employer_id(service: &PayrollService, name: &str) -> EmployerId {
        service
            .database()
            .with_conn(|conn| employer_repo::find_unit(conn, name))
            .unwrap()
            .unwrap()
            .id
    }

    #[test]
    fn test_employer_percentile_includes_departments() {
        let service = service();
        let salaries: Vec<SalaryId> = service
            .database()
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT id FROM salaries ORDER BY id")?;
                let ids = stmt
                    .query_map([], |r| r.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .unwrap();

        let ranks: Vec<Option<f64>> = salaries
            .iter()
            .map(|id| service.employer_percentile(*id).unwrap().value())
            .collect();
        // Department salaries rank against the unit and its sibling
        // departments.
        assert_eq!(ranks[0], Some(0.0));
        assert!((ranks[1].unwrap() - 66.666).abs() < 0.01);
        assert_eq!(ranks[1], ranks[2]);
        assert_eq!(ranks[3], Some(100.0));

        let unit = employer_id(&service, "OAK PARK");
        let engine = service.engine(2017).unwrap();
        let rank = engine
            .rank_at_employer(unit, 2017, Money::from_dollars(45_000))
            .unwrap()
            .value()
            .unwrap();
        assert!((rank - 66.666).abs() < 0.01);

        // Unclassified employers have no peers.
        assert_eq!(
            service.like_employer_percentile(salaries[0]).unwrap(),
            Percentile::NotApplicable
        );
    }

    #[test]
    fn test_profile_and_summary() {
        let service = service();
        let unit = employer_id(&service, "OAK PARK");

        let profile = service.employer_profile(unit, None).unwrap();
        assert_eq!(profile.year, 2017);
        assert_eq!(profile.name, "Oak Park");
        assert_eq!(profile.headcount, 4);
        assert_eq!(profile.total_pay, Money::from_dollars(210_000));
        assert_eq!(profile.median_pay, Some(Money::from_dollars(45_000)));
        assert_eq!(profile.departments.len(), 2);
        assert_eq!(profile.departments[0].name, "Oak Park Police");
        assert!(!profile.comparable);

        let summary = service.year_summary(2017).unwrap();
        assert_eq!(summary.units, 1);
        assert_eq!(summary.departments, 2);
        assert_eq!(summary.salaries, 4);
        assert_eq!(summary.people, 4);
    }

    #[test]
    fn test_import_invalidates_cached_year() {
        let service = service();
        assert_eq!(service.year_summary(2017).unwrap().salaries, 4);

        service
            .import(&batch(2017, vec![record("EVANSTON", None, "EVE", 50_000)]))
            .unwrap();
        assert_eq!(service.year_summary(2017).unwrap().salaries, 5);
        assert_eq!(service.years().unwrap(), vec![2017]);
    }

    #[test]
    fn test_import_invalidates_other_cached_years() {
        let service = service();
        assert_eq!(service.year_summary(2017).unwrap().units, 1);

        service
            .import(&batch(2018, vec![record("EVANSTON", None, "EVE", 50_000)]))
            .unwrap();
        let evanston = employer_id(&service, "EVANSTON");
        let profile = service.employer_profile(evanston, Some(2017)).unwrap();
        assert_eq!(profile.headcount, 0);
        assert_eq!(profile.median_pay, None);
    }

    #[test]
    fn test_department_profile_counts_its_own_staff() {
        let service = service();
        let unit = employer_id(&service, "OAK PARK");
        let police = service
            .database()
            .with_conn(|conn| employer_repo::find_department(conn, unit, "POLICE"))
            .unwrap()
            .unwrap()
            .id;

        let profile = service.employer_profile(police, Some(2017)).unwrap();
        assert!(profile.is_department);
        assert_eq!(profile.headcount, 2);
        assert_eq!(profile.total_pay, Money::from_dollars(90_000));
    }

    #[test]
    fn test_missing_rows_are_not_found() {
        let service = service();
        assert!(matches!(
            service.salary_percentiles(9_999),
            Err(PayrollError::NotFound { kind: "salary", .. })
        ));
        assert!(matches!(
            service.size_class(9_999, None),
            Err(PayrollError::NotFound { kind: "employer", .. })
        ));
    }

    #[test]
    fn test_jobs_of_employer() {
        let service = service();
        let unit = employer_id(&service, "OAK PARK");
        let jobs = service.jobs_of_employer(unit, 2017, 2).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].total_pay, Money::from_dollars(90_000));
    }
}
