//! Compensation repository: people, positions, jobs and salaries.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{format_date, get_date, DatabaseError};
use crate::display::{employer_display_name, person_display_name, title_case, unique_slug};
use crate::error::ValidationError;
use crate::model::{
    total_pay, validate_pay, EmployerId, Job, JobId, Money, Person, PersonId, Position,
    PositionId, Salary, SalaryId, VintageId,
};

pub(crate) fn person_from_row(row: &Row<'_>) -> Result<Person, rusqlite::Error> {
    Ok(Person {
        id: row.get("id")?,
        vintage_id: row.get("vintage_id")?,
        slug: row.get("slug")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        noindex: row.get("noindex")?,
    })
}

pub(crate) fn position_from_row(row: &Row<'_>) -> Result<Position, rusqlite::Error> {
    Ok(Position {
        id: row.get("id")?,
        vintage_id: row.get("vintage_id")?,
        employer_id: row.get("employer_id")?,
        title: row.get("title")?,
    })
}

pub(crate) fn job_from_row(row: &Row<'_>) -> Result<Job, rusqlite::Error> {
    Ok(Job {
        id: row.get("id")?,
        vintage_id: row.get("vintage_id")?,
        person_id: row.get("person_id")?,
        position_id: row.get("position_id")?,
        start_date: get_date(row, "start_date")?,
    })
}

pub(crate) fn salary_from_row(row: &Row<'_>) -> Result<Salary, rusqlite::Error> {
    let amount: Option<i64> = row.get("amount_cents")?;
    let extra_pay: Option<i64> = row.get("extra_pay_cents")?;
    Ok(Salary {
        id: row.get("id")?,
        vintage_id: row.get("vintage_id")?,
        job_id: row.get("job_id")?,
        amount: amount.map(Money::from_cents),
        extra_pay: extra_pay.map(Money::from_cents),
    })
}

// ─── People ─────────────────────────────────────────────────────────────────

/// Inserts a person with a slug derived from their display name.
pub fn insert_person(
    conn: &Connection,
    vintage_id: VintageId,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<Person, DatabaseError> {
    let display = person_display_name(first_name, last_name);
    let mut slug_check = conn.prepare("SELECT 1 FROM people WHERE slug = ?1")?;
    let slug = unique_slug(&display, |candidate| {
        slug_check.exists(params![candidate]).unwrap_or(true)
    });

    conn.execute(
        "INSERT INTO people (vintage_id, slug, first_name, last_name) VALUES (?1, ?2, ?3, ?4)",
        params![vintage_id, slug, first_name, last_name],
    )?;

    Ok(Person {
        id: conn.last_insert_rowid(),
        vintage_id,
        slug,
        first_name: first_name.map(str::to_string),
        last_name: last_name.map(str::to_string),
        noindex: false,
    })
}

pub fn find_person(conn: &Connection, id: PersonId) -> Result<Option<Person>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM people WHERE id = ?1",
            params![id],
            person_from_row,
        )
        .optional()?)
}

pub fn set_noindex(conn: &Connection, id: PersonId, noindex: bool) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE people SET noindex = ?2 WHERE id = ?1",
        params![id, noindex],
    )?;
    Ok(updated > 0)
}

// ─── Positions ──────────────────────────────────────────────────────────────

pub fn find_position(
    conn: &Connection,
    employer_id: EmployerId,
    title: &str,
) -> Result<Option<Position>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM positions WHERE employer_id = ?1 AND title = ?2",
            params![employer_id, title],
            position_from_row,
        )
        .optional()?)
}

/// Inserts a position; titles are unique per employer.
pub fn insert_position(
    conn: &Connection,
    vintage_id: VintageId,
    employer_id: EmployerId,
    title: &str,
) -> Result<Position, DatabaseError> {
    if find_position(conn, employer_id, title)?.is_some() {
        return Err(ValidationError::DuplicatePosition {
            title: title.to_string(),
            employer_id,
        }
        .into());
    }

    conn.execute(
        "INSERT INTO positions (vintage_id, employer_id, title) VALUES (?1, ?2, ?3)",
        params![vintage_id, employer_id, title],
    )?;
    Ok(Position {
        id: conn.last_insert_rowid(),
        vintage_id,
        employer_id,
        title: title.to_string(),
    })
}

pub fn get_or_create_position(
    conn: &Connection,
    vintage_id: VintageId,
    employer_id: EmployerId,
    title: &str,
) -> Result<(Position, bool), DatabaseError> {
    match find_position(conn, employer_id, title)? {
        Some(position) => Ok((position, false)),
        None => Ok((insert_position(conn, vintage_id, employer_id, title)?, true)),
    }
}

// ─── Jobs and salaries ──────────────────────────────────────────────────────

pub fn insert_job(
    conn: &Connection,
    vintage_id: VintageId,
    person_id: PersonId,
    position_id: PositionId,
    start_date: Option<NaiveDate>,
) -> Result<Job, DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (vintage_id, person_id, position_id, start_date) VALUES (?1, ?2, ?3, ?4)",
        params![vintage_id, person_id, position_id, start_date.map(format_date)],
    )?;
    Ok(Job {
        id: conn.last_insert_rowid(),
        vintage_id,
        person_id,
        position_id,
        start_date,
    })
}

pub fn find_job(conn: &Connection, id: JobId) -> Result<Option<Job>, DatabaseError> {
    Ok(conn
        .query_row("SELECT * FROM jobs WHERE id = ?1", params![id], job_from_row)
        .optional()?)
}

/// Inserts a salary. At least one of `amount` and `extra_pay` is required.
pub fn insert_salary(
    conn: &Connection,
    vintage_id: VintageId,
    job_id: JobId,
    amount: Option<Money>,
    extra_pay: Option<Money>,
) -> Result<Salary, DatabaseError> {
    validate_pay(job_id, amount, extra_pay)?;

    conn.execute(
        "INSERT INTO salaries (vintage_id, job_id, amount_cents, extra_pay_cents)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            vintage_id,
            job_id,
            amount.map(Money::cents),
            extra_pay.map(Money::cents),
        ],
    )?;
    Ok(Salary {
        id: conn.last_insert_rowid(),
        vintage_id,
        job_id,
        amount,
        extra_pay,
    })
}

pub fn find_salary(conn: &Connection, id: SalaryId) -> Result<Option<Salary>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM salaries WHERE id = ?1",
            params![id],
            salary_from_row,
        )
        .optional()?)
}

/// Reporting year of a salary, through its vintage.
pub fn salary_year(conn: &Connection, id: SalaryId) -> Result<Option<i32>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT v.reporting_year
             FROM salaries s JOIN vintage_years v ON v.vintage_id = s.vintage_id
             WHERE s.id = ?1",
            params![id],
            |r| r.get(0),
        )
        .optional()?)
}

// ─── Listings ───────────────────────────────────────────────────────────────

/// One row of an employer's payroll listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub salary_id: SalaryId,
    pub job_id: JobId,
    pub person_slug: String,
    pub name: String,
    pub title: String,
    pub employer_id: EmployerId,
    pub employer_name: String,
    pub amount: Option<Money>,
    pub extra_pay: Option<Money>,
    pub total_pay: Money,
    pub start_date: Option<NaiveDate>,
}

fn listing_from_row(row: &Row<'_>) -> Result<JobListing, rusqlite::Error> {
    let amount: Option<i64> = row.get("amount_cents")?;
    let extra_pay: Option<i64> = row.get("extra_pay_cents")?;
    let amount = amount.map(Money::from_cents);
    let extra_pay = extra_pay.map(Money::from_cents);

    let first_name: Option<String> = row.get("first_name")?;
    let last_name: Option<String> = row.get("last_name")?;
    let title: String = row.get("title")?;
    let employer_name: String = row.get("employer_name")?;
    let parent_name: Option<String> = row.get("parent_name")?;

    Ok(JobListing {
        salary_id: row.get("salary_id")?,
        job_id: row.get("job_id")?,
        person_slug: row.get("person_slug")?,
        name: person_display_name(first_name.as_deref(), last_name.as_deref()),
        title: title_case(&title),
        employer_id: row.get("employer_id")?,
        employer_name: employer_display_name(&employer_name, parent_name.as_deref()),
        amount,
        extra_pay,
        total_pay: total_pay(amount, extra_pay),
        start_date: get_date(row, "start_date")?,
    })
}

/// Highest-paid jobs at an employer in `year`, by base amount.
///
/// A unit's listing includes its departments; a department's listing is
/// its own.
pub fn jobs_of_employer(
    conn: &Connection,
    employer_id: EmployerId,
    year: i32,
    limit: usize,
) -> Result<Vec<JobListing>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.id AS salary_id, s.amount_cents, s.extra_pay_cents,
                j.id AS job_id, j.start_date,
                pe.slug AS person_slug, pe.first_name, pe.last_name,
                po.title,
                e.id AS employer_id, e.name AS employer_name, p.name AS parent_name
         FROM salaries s
         JOIN vintage_years v ON v.vintage_id = s.vintage_id
         JOIN jobs j ON j.id = s.job_id
         JOIN people pe ON pe.id = j.person_id
         JOIN positions po ON po.id = j.position_id
         JOIN employers e ON e.id = po.employer_id
         LEFT JOIN employers p ON p.id = e.parent_id
         WHERE v.reporting_year = ?2
           AND (e.id = ?1 OR e.parent_id = ?1)
         ORDER BY s.amount_cents DESC NULLS LAST, s.id
         LIMIT ?3",
    )?;
    let rows = stmt
        .query_map(params![employer_id, year, limit as i64], listing_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
