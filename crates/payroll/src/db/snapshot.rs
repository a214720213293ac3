//! Builds an in-memory [`Payroll`] from the database.

use rusqlite::{params, Connection, Row};

use super::compensation_repo::{job_from_row, person_from_row, position_from_row, salary_from_row};
use super::{employer_repo, vintage_repo, DatabaseError};
use crate::payroll::Payroll;

/// Ids of jobs paid in the requested year, or all jobs when the year is NULL.
const JOBS_IN_YEAR: &str = "SELECT s.job_id
     FROM salaries s JOIN vintage_years v ON v.vintage_id = s.vintage_id
     WHERE ?1 IS NULL OR v.reporting_year = ?1";

fn query_scoped<T, F>(
    conn: &Connection,
    sql: &str,
    year: Option<i32>,
    map: F,
) -> Result<Vec<T>, DatabaseError>
where
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![year], map)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Loads a snapshot. Employers, classifications and populations are always
/// loaded in full; compensation rows are limited to `year` when given.
pub fn load(conn: &Connection, year: Option<i32>) -> Result<Payroll, DatabaseError> {
    let _span = tracing::info_span!("snapshot_load", year = ?year).entered();
    let mut payroll = Payroll::new();

    for (vintage_id, reporting_year) in vintage_repo::vintage_years(conn)? {
        payroll.add_vintage(vintage_id, reporting_year);
    }
    for taxonomy in employer_repo::list_taxonomies(conn)? {
        payroll.add_taxonomy(taxonomy);
    }
    for universe in employer_repo::list_universes(conn)? {
        payroll.add_universe(universe);
    }
    for employer in employer_repo::list(conn)? {
        let id = employer.id;
        payroll
            .add_employer(employer)
            .map_err(DatabaseError::snapshot("employers", id))?;
    }
    for reading in employer_repo::list_populations(conn)? {
        let id = reading.employer_id;
        payroll
            .add_population(reading)
            .map_err(DatabaseError::snapshot("employer_populations", id))?;
    }

    let people = query_scoped(
        conn,
        &format!(
            "SELECT * FROM people WHERE id IN
             (SELECT person_id FROM jobs WHERE id IN ({JOBS_IN_YEAR})) ORDER BY id"
        ),
        year,
        person_from_row,
    )?;
    let positions = query_scoped(
        conn,
        &format!(
            "SELECT * FROM positions WHERE id IN
             (SELECT position_id FROM jobs WHERE id IN ({JOBS_IN_YEAR})) ORDER BY id"
        ),
        year,
        position_from_row,
    )?;
    let jobs = query_scoped(
        conn,
        &format!("SELECT * FROM jobs WHERE id IN ({JOBS_IN_YEAR}) ORDER BY id"),
        year,
        job_from_row,
    )?;
    let salaries = query_scoped(
        conn,
        "SELECT s.* FROM salaries s JOIN vintage_years v ON v.vintage_id = s.vintage_id
         WHERE ?1 IS NULL OR v.reporting_year = ?1 ORDER BY s.id",
        year,
        salary_from_row,
    )?;

    for person in people {
        payroll.add_person(person);
    }
    for position in positions {
        let id = position.id;
        payroll
            .add_position(position)
            .map_err(DatabaseError::snapshot("positions", id))?;
    }
    for job in jobs {
        let id = job.id;
        payroll
            .add_job(job)
            .map_err(DatabaseError::snapshot("jobs", id))?;
    }
    let salary_count = salaries.len();
    for salary in salaries {
        let id = salary.id;
        payroll
            .add_salary(salary)
            .map_err(DatabaseError::snapshot("salaries", id))?;
    }

    log::debug!(
        "Loaded payroll snapshot (year {:?}): {} employers, {} salaries",
        year,
        payroll.employers().count(),
        salary_count
    );
    Ok(payroll)
}
