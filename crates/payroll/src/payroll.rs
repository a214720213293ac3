//! In-memory snapshot of the payroll tables.
//!
//! [`Payroll`] is an arena keyed by row id. Rows are validated as they are
//! added, so a snapshot never holds a department with a taxonomy, a salary
//! without pay, or a reference to a row it does not contain. Snapshots are
//! read-only once built and are shared between threads behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::classification::{self, SizeClass};
use crate::error::ValidationError;
use crate::model::{
    closest_population, Employer, EmployerId, EmployerPopulation, EmployerTaxonomy,
    EmployerUniverse, Job, JobId, Person, PersonId, Position, PositionId, Salary, SalaryId,
    TaxonomyId, UniverseId, VintageId,
};

#[derive(Debug, Default, Clone)]
pub struct Payroll {
    years: HashMap<VintageId, i32>,
    taxonomies: BTreeMap<TaxonomyId, EmployerTaxonomy>,
    universes: BTreeMap<UniverseId, EmployerUniverse>,
    employers: BTreeMap<EmployerId, Employer>,
    employer_names: HashSet<(Option<EmployerId>, String)>,
    departments: HashMap<EmployerId, Vec<EmployerId>>,
    populations: HashMap<EmployerId, Vec<EmployerPopulation>>,
    people: BTreeMap<PersonId, Person>,
    positions: BTreeMap<PositionId, Position>,
    position_titles: HashSet<(EmployerId, String)>,
    jobs: BTreeMap<JobId, Job>,
    salaries: BTreeMap<SalaryId, Salary>,
}

fn unknown(kind: &'static str, id: i64) -> ValidationError {
    ValidationError::UnknownReference { kind, id }
}

impl Payroll {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Writes ─────────────────────────────────────────────────────────────

    /// Registers an import vintage and the reporting year it resolves to.
    pub fn add_vintage(&mut self, vintage_id: VintageId, reporting_year: i32) {
        self.years.insert(vintage_id, reporting_year);
    }

    pub fn add_taxonomy(&mut self, taxonomy: EmployerTaxonomy) {
        self.taxonomies.insert(taxonomy.id, taxonomy);
    }

    pub fn add_universe(&mut self, universe: EmployerUniverse) {
        self.universes.insert(universe.id, universe);
    }

    /// Adds an employer. Parents must be added before their departments.
    pub fn add_employer(&mut self, employer: Employer) -> Result<(), ValidationError> {
        employer.validate()?;

        if let Some(parent_id) = employer.parent_id {
            let parent = self
                .employers
                .get(&parent_id)
                .ok_or_else(|| unknown("employer", parent_id))?;
            if parent.is_department() {
                return Err(ValidationError::NestedDepartment {
                    name: employer.name.clone(),
                    parent_id,
                });
            }
        }
        if let Some(taxonomy_id) = employer.taxonomy_id {
            if !self.taxonomies.contains_key(&taxonomy_id) {
                return Err(unknown("taxonomy", taxonomy_id));
            }
        }
        if let Some(universe_id) = employer.universe_id {
            if !self.universes.contains_key(&universe_id) {
                return Err(unknown("universe", universe_id));
            }
        }

        let name_key = (employer.parent_id, employer.name.clone());
        if self.employer_names.contains(&name_key) {
            return Err(match employer.parent_id {
                Some(parent_id) => ValidationError::DuplicateDepartment {
                    name: employer.name,
                    parent_id,
                },
                None => ValidationError::DuplicateUnit {
                    name: employer.name,
                },
            });
        }

        self.employer_names.insert(name_key);
        if let Some(parent_id) = employer.parent_id {
            self.departments.entry(parent_id).or_default().push(employer.id);
        }
        self.employers.insert(employer.id, employer);
        Ok(())
    }

    pub fn add_population(&mut self, reading: EmployerPopulation) -> Result<(), ValidationError> {
        if !self.employers.contains_key(&reading.employer_id) {
            return Err(unknown("employer", reading.employer_id));
        }

        let readings = self.populations.entry(reading.employer_id).or_default();
        if readings.iter().any(|r| r.data_year == reading.data_year) {
            return Err(ValidationError::DuplicatePopulation {
                employer_id: reading.employer_id,
                data_year: reading.data_year,
            });
        }
        readings.push(reading);
        Ok(())
    }

    pub fn add_person(&mut self, person: Person) {
        self.people.insert(person.id, person);
    }

    pub fn add_position(&mut self, position: Position) -> Result<(), ValidationError> {
        if !self.employers.contains_key(&position.employer_id) {
            return Err(unknown("employer", position.employer_id));
        }

        let key = (position.employer_id, position.title.clone());
        if self.position_titles.contains(&key) {
            return Err(ValidationError::DuplicatePosition {
                title: position.title,
                employer_id: position.employer_id,
            });
        }

        self.position_titles.insert(key);
        self.positions.insert(position.id, position);
        Ok(())
    }

    pub fn add_job(&mut self, job: Job) -> Result<(), ValidationError> {
        if !self.people.contains_key(&job.person_id) {
            return Err(unknown("person", job.person_id));
        }
        if !self.positions.contains_key(&job.position_id) {
            return Err(unknown("position", job.position_id));
        }
        if !self.years.contains_key(&job.vintage_id) {
            return Err(unknown("vintage", job.vintage_id));
        }
        self.jobs.insert(job.id, job);
        Ok(())
    }

    pub fn add_salary(&mut self, salary: Salary) -> Result<(), ValidationError> {
        salary.validate()?;
        if !self.jobs.contains_key(&salary.job_id) {
            return Err(unknown("job", salary.job_id));
        }
        if !self.years.contains_key(&salary.vintage_id) {
            return Err(unknown("vintage", salary.vintage_id));
        }
        self.salaries.insert(salary.id, salary);
        Ok(())
    }

    // ─── Lookups ────────────────────────────────────────────────────────────

    pub fn reporting_year(&self, vintage_id: VintageId) -> Option<i32> {
        self.years.get(&vintage_id).copied()
    }

    /// Reporting years with at least one salary, ascending.
    pub fn salary_years(&self) -> BTreeSet<i32> {
        self.salaries
            .values()
            .filter_map(|s| self.reporting_year(s.vintage_id))
            .collect()
    }

    pub fn taxonomy(&self, id: TaxonomyId) -> Option<&EmployerTaxonomy> {
        self.taxonomies.get(&id)
    }

    pub fn universe(&self, id: UniverseId) -> Option<&EmployerUniverse> {
        self.universes.get(&id)
    }

    pub fn employer(&self, id: EmployerId) -> Option<&Employer> {
        self.employers.get(&id)
    }

    pub fn employers(&self) -> impl Iterator<Item = &Employer> {
        self.employers.values()
    }

    pub fn parent(&self, employer: &Employer) -> Option<&Employer> {
        employer.parent_id.and_then(|id| self.employers.get(&id))
    }

    /// Departments of a unit, in insertion order.
    pub fn departments(&self, unit_id: EmployerId) -> impl Iterator<Item = &Employer> {
        self.departments
            .get(&unit_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.employers.get(id))
    }

    pub fn employer_taxonomy(&self, employer: &Employer) -> Option<&EmployerTaxonomy> {
        employer.taxonomy_id.and_then(|id| self.taxonomy(id))
    }

    pub fn employer_universe(&self, employer: &Employer) -> Option<&EmployerUniverse> {
        employer.universe_id.and_then(|id| self.universe(id))
    }

    pub fn populations(&self, employer_id: EmployerId) -> &[EmployerPopulation] {
        self.populations
            .get(&employer_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Population nearest to `year`, or to the employer's own reporting year
    /// when `year` is `None`.
    pub fn get_population(&self, employer_id: EmployerId, year: Option<i32>) -> Option<i64> {
        let target = match year {
            Some(year) => year,
            None => self.reporting_year(self.employer(employer_id)?.vintage_id)?,
        };
        closest_population(self.populations(employer_id), target).map(|p| p.population)
    }

    pub fn size_class(&self, employer_id: EmployerId, year: Option<i32>) -> Option<SizeClass> {
        let employer = self.employer(employer_id)?;
        classification::size_class(
            self.employer_taxonomy(employer),
            self.get_population(employer_id, year),
        )
    }

    pub fn person(&self, id: PersonId) -> Option<&Person> {
        self.people.get(&id)
    }

    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn salary(&self, id: SalaryId) -> Option<&Salary> {
        self.salaries.get(&id)
    }

    pub fn salaries(&self) -> impl Iterator<Item = &Salary> {
        self.salaries.values()
    }

    /// Salaries whose vintage reports `year`.
    pub fn salaries_in_year(&self, year: i32) -> impl Iterator<Item = &Salary> {
        self.salaries
            .values()
            .filter(move |s| self.reporting_year(s.vintage_id) == Some(year))
    }

    /// The employer a salary's job is attached to.
    pub fn salary_employer(&self, salary: &Salary) -> Option<&Employer> {
        let job = self.job(salary.job_id)?;
        let position = self.position(job.position_id)?;
        self.employer(position.employer_id)
    }

    pub fn salary_employer_id(&self, salary: &Salary) -> Option<EmployerId> {
        let job = self.job(salary.job_id)?;
        self.position(job.position_id).map(|p| p.employer_id)
    }

    /// Salaries for jobs of `job_id`.
    pub fn job_salaries(&self, job_id: JobId) -> impl Iterator<Item = &Salary> {
        self.salaries.values().filter(move |s| s.job_id == job_id)
    }
}
