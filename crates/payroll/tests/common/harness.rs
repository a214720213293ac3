//! Test harness for isolated test execution.
//!
//! `TestHarness` owns a temporary directory holding a file-backed database
//! and a `PayrollService` over it.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use payroll::db::{employer_repo, Database};
use payroll::ingest::{ImportSummary, StandardizedBatch};
use payroll::model::{EmployerId, EmployerPopulation, TaxonomyId, UniverseId};
use payroll::PayrollService;

pub struct TestHarness {
    /// Keeps the database directory alive for the harness's lifetime.
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub service: Arc<PayrollService>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("data").join("payroll.db");
        let db = Database::open(&db_path).expect("Failed to open test database");

        Self {
            temp_dir,
            db_path,
            service: Arc::new(PayrollService::new(db)),
        }
    }

    /// Re-opens the database file with a fresh service and empty caches.
    pub fn reopen(&mut self) {
        let db = Database::open(&self.db_path).expect("Failed to reopen test database");
        self.service = Arc::new(PayrollService::new(db));
    }

    pub fn import(&self, batch: &StandardizedBatch) -> ImportSummary {
        self.service.import(batch).expect("import failed")
    }

    pub fn unit(&self, name: &str) -> EmployerId {
        self.service
            .database()
            .with_conn(|conn| employer_repo::find_unit(conn, name))
            .expect("query failed")
            .unwrap_or_else(|| panic!("no unit named {}", name))
            .id
    }

    pub fn department(&self, unit: &str, name: &str) -> EmployerId {
        let unit_id = self.unit(unit);
        self.service
            .database()
            .with_conn(|conn| employer_repo::find_department(conn, unit_id, name))
            .expect("query failed")
            .unwrap_or_else(|| panic!("no department {} under {}", name, unit))
            .id
    }

    pub fn taxonomy(&self, entity_type: &str, chicago: bool, cook_or_collar: bool) -> TaxonomyId {
        self.service
            .database()
            .with_conn(|conn| {
                employer_repo::insert_taxonomy(conn, entity_type, chicago, cook_or_collar)
            })
            .expect("insert failed")
            .id
    }

    pub fn universe(&self, name: &str) -> UniverseId {
        self.service
            .database()
            .with_conn(|conn| employer_repo::insert_universe(conn, name))
            .expect("insert failed")
            .id
    }

    /// Classifies employers. Classification changes are not imports, so the
    /// harness re-opens to drop cached engines.
    pub fn classify_unit(&mut self, employer_id: EmployerId, taxonomy_id: TaxonomyId) {
        self.service
            .database()
            .with_conn(|conn| employer_repo::set_taxonomy(conn, employer_id, Some(taxonomy_id)))
            .expect("set_taxonomy failed");
        self.reopen();
    }

    pub fn classify_department(&mut self, employer_id: EmployerId, universe_id: UniverseId) {
        self.service
            .database()
            .with_conn(|conn| employer_repo::set_universe(conn, employer_id, Some(universe_id)))
            .expect("set_universe failed");
        self.reopen();
    }

    pub fn population(&mut self, employer_id: EmployerId, population: i64, data_year: i32) {
        self.service
            .database()
            .with_conn(|conn| {
                employer_repo::add_population(
                    conn,
                    &EmployerPopulation {
                        employer_id,
                        population,
                        data_year,
                    },
                )
            })
            .expect("add_population failed");
        self.reopen();
    }

    /// Salary ids in `year`, ordered by id.
    pub fn salary_ids(&self, year: i32) -> Vec<i64> {
        self.service
            .database()
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT s.id FROM salaries s
                     JOIN vintage_years v ON v.vintage_id = s.vintage_id
                     WHERE v.reporting_year = ?1 ORDER BY s.id",
                )?;
                let ids = stmt
                    .query_map([year], |r| r.get(0))?
                    .collect::<Result<Vec<i64>, _>>()?;
                Ok(ids)
            })
            .expect("query failed")
    }
}
