//! Builder patterns for creating test data programmatically.
//!
//! These builders allocate ids and fill in the rows a salary hangs off
//! (person, position, job) so tests only state what they care about.

#![allow(dead_code)]

use std::collections::HashMap;

use payroll::ingest::{StandardizedBatch, StandardizedRecord};
use payroll::model::{
    Employer, EmployerId, EmployerPopulation, EmployerTaxonomy, EmployerUniverse, Job, Money,
    Person, Position, Salary, SalaryId, TaxonomyId, UniverseId, VintageId,
};
use payroll::Payroll;

/// Builder for in-memory `Payroll` snapshots.
pub struct PayrollBuilder {
    payroll: Payroll,
    next_id: i64,
    vintages: HashMap<i32, VintageId>,
    base_year: i32,
}

impl PayrollBuilder {
    /// Employers are created under a 2017 vintage unless `base_year` says
    /// otherwise.
    pub fn new() -> Self {
        Self {
            payroll: Payroll::new(),
            next_id: 1,
            vintages: HashMap::new(),
            base_year: 2017,
        }
    }

    pub fn base_year(mut self, year: i32) -> Self {
        self.base_year = year;
        self
    }

    fn id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The vintage reporting `year`, created on first use.
    pub fn vintage(&mut self, year: i32) -> VintageId {
        if let Some(id) = self.vintages.get(&year) {
            return *id;
        }
        let id = self.id();
        self.payroll.add_vintage(id, year);
        self.vintages.insert(year, id);
        id
    }

    pub fn taxonomy(&mut self, entity_type: &str, chicago: bool, cook_or_collar: bool) -> TaxonomyId {
        let id = self.id();
        self.payroll.add_taxonomy(EmployerTaxonomy {
            id,
            entity_type: entity_type.to_string(),
            chicago,
            cook_or_collar,
        });
        id
    }

    pub fn universe(&mut self, name: &str) -> UniverseId {
        let id = self.id();
        self.payroll.add_universe(EmployerUniverse {
            id,
            name: name.to_string(),
        });
        id
    }

    pub fn unit(&mut self, name: &str, taxonomy_id: Option<TaxonomyId>) -> EmployerId {
        self.employer(name, None, taxonomy_id, None)
    }

    pub fn department(
        &mut self,
        parent_id: EmployerId,
        name: &str,
        universe_id: Option<UniverseId>,
    ) -> EmployerId {
        self.employer(name, Some(parent_id), None, universe_id)
    }

    fn employer(
        &mut self,
        name: &str,
        parent_id: Option<EmployerId>,
        taxonomy_id: Option<TaxonomyId>,
        universe_id: Option<UniverseId>,
    ) -> EmployerId {
        let vintage_id = self.vintage(self.base_year);
        let id = self.id();
        self.payroll
            .add_employer(Employer {
                id,
                vintage_id,
                slug: format!("employer-{}", id),
                name: name.to_string(),
                parent_id,
                taxonomy_id,
                universe_id,
            })
            .expect("invalid test employer");
        id
    }

    pub fn population(&mut self, employer_id: EmployerId, population: i64, data_year: i32) {
        self.payroll
            .add_population(EmployerPopulation {
                employer_id,
                population,
                data_year,
            })
            .expect("invalid test population");
    }

    /// A salary of `dollars` at `employer_id` in `year`.
    pub fn salary(&mut self, employer_id: EmployerId, year: i32, dollars: i64) -> SalaryId {
        self.pay(employer_id, year, Some(Money::from_dollars(dollars)), None)
    }

    pub fn pay(
        &mut self,
        employer_id: EmployerId,
        year: i32,
        amount: Option<Money>,
        extra_pay: Option<Money>,
    ) -> SalaryId {
        let vintage_id = self.vintage(year);

        let person_id = self.id();
        self.payroll.add_person(Person {
            id: person_id,
            vintage_id,
            slug: format!("person-{}", person_id),
            first_name: None,
            last_name: None,
            noindex: false,
        });

        let position_id = self.id();
        self.payroll
            .add_position(Position {
                id: position_id,
                vintage_id,
                employer_id,
                title: format!("Position {}", position_id),
            })
            .expect("invalid test position");

        let job_id = self.id();
        self.payroll
            .add_job(Job {
                id: job_id,
                vintage_id,
                person_id,
                position_id,
                start_date: None,
            })
            .expect("invalid test job");

        let salary_id = self.id();
        self.payroll
            .add_salary(Salary {
                id: salary_id,
                vintage_id,
                job_id,
                amount,
                extra_pay,
            })
            .expect("invalid test salary");
        salary_id
    }

    pub fn build(self) -> Payroll {
        self.payroll
    }
}

impl Default for PayrollBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StandardizedBatch` instances.
pub struct BatchBuilder {
    reporting_year: i32,
    file_name: String,
    responding_agency: Option<String>,
    records: Vec<StandardizedRecord>,
}

impl BatchBuilder {
    pub fn new(reporting_year: i32) -> Self {
        Self {
            reporting_year,
            file_name: format!("payroll-{}.json", reporting_year),
            responding_agency: None,
            records: vec![],
        }
    }

    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = name.to_string();
        self
    }

    pub fn responding_agency(mut self, name: &str) -> Self {
        self.responding_agency = Some(name.to_string());
        self
    }

    /// Add a salaried record. `department` of `None` puts the job at the unit.
    pub fn record(
        mut self,
        employer: &str,
        department: Option<&str>,
        title: &str,
        name: (&str, &str),
        dollars: i64,
    ) -> Self {
        self.records.push(StandardizedRecord {
            employer: employer.to_string(),
            department: department.map(str::to_string),
            title: title.to_string(),
            first_name: Some(name.0.to_string()),
            last_name: Some(name.1.to_string()),
            salary: Some(Money::from_dollars(dollars)),
            extra_pay: None,
            date_started: None,
        });
        self
    }

    /// Add a fully specified record.
    pub fn raw_record(mut self, record: StandardizedRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn build(self) -> StandardizedBatch {
        StandardizedBatch {
            reporting_year: self.reporting_year,
            file_name: self.file_name,
            responding_agency: self.responding_agency,
            created_by: None,
            records: self.records,
        }
    }
}
