//! Import of standardized payroll batches.
//!
//! A batch is one reporting year's worth of standardized records. Each
//! import creates a new vintage (upload) and walks its standardized file
//! through the review states while units, departments and compensation
//! rows are matched or created. The whole import is one transaction.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::{compensation_repo, employer_repo, parse_date, vintage_repo, Database};
use crate::error::ImportError;
use crate::model::{EmployerId, FileStatus, Money, VintageId, MAX_PAY};

/// A standardized payroll file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedBatch {
    pub reporting_year: i32,
    pub file_name: String,
    #[serde(default)]
    pub responding_agency: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub records: Vec<StandardizedRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedRecord {
    pub employer: String,
    #[serde(default)]
    pub department: Option<String>,
    pub title: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub salary: Option<Money>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub extra_pay: Option<Money>,
    #[serde(default)]
    pub date_started: Option<String>,
}

/// Amounts arrive either as JSON numbers or as formatted strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<Money>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawAmount> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawAmount::Number(n)) => Ok(Some(Money::from_cents((n * 100.0).round() as i64))),
        Some(RawAmount::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawAmount::Text(s)) => Money::parse(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount '{}'", s))),
    }
}

/// Start dates come as `YYYY-MM-DD` or `MM/DD/YYYY`.
fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    parse_date(raw)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

impl StandardizedRecord {
    fn check(&self, index: usize) -> Result<Option<NaiveDate>, ImportError> {
        let invalid = |reason: &str| ImportError::InvalidRecord {
            index,
            reason: reason.to_string(),
        };

        if self.employer.trim().is_empty() {
            return Err(invalid("employer is empty"));
        }
        if self.title.trim().is_empty() {
            return Err(invalid("title is empty"));
        }
        if self.salary.is_none() && self.extra_pay.is_none() {
            return Err(invalid("record has neither salary nor extra pay"));
        }
        if let Some(amount) = [self.salary, self.extra_pay]
            .into_iter()
            .flatten()
            .find(|part| part.abs() > MAX_PAY)
        {
            return Err(invalid(&format!("pay {} is out of range", amount)));
        }

        match self.date_started.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_start_date(raw)
                .map(Some)
                .ok_or_else(|| invalid(&format!("unreadable start date '{}'", raw))),
        }
    }
}

/// Counts of what an import created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub vintage_id: VintageId,
    pub reporting_year: i32,
    pub units_created: usize,
    pub departments_created: usize,
    pub positions_created: usize,
    pub people_created: usize,
    pub salaries_created: usize,
}

/// Reads a batch from a JSON file.
pub fn load_batch(path: &Path) -> Result<StandardizedBatch, ImportError> {
    let content = fs::read_to_string(path).map_err(|e| ImportError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Imports a batch under a new vintage. Nothing is stored if any record is
/// rejected.
pub fn import_batch(db: &Database, batch: &StandardizedBatch) -> Result<ImportSummary, ImportError> {
    let _span = tracing::info_span!(
        "import_batch",
        file = %batch.file_name,
        year = batch.reporting_year,
        records = batch.records.len()
    )
    .entered();

    let start_dates = batch
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| record.check(index))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = db.with_tx(|tx| import_records(tx, batch, &start_dates))?;

    log::info!(
        "Imported '{}' as vintage {}: {} salaries, {} new units, {} new departments",
        batch.file_name,
        summary.vintage_id,
        summary.salaries_created,
        summary.units_created,
        summary.departments_created
    );
    Ok(summary)
}

fn import_records(
    conn: &Connection,
    batch: &StandardizedBatch,
    start_dates: &[Option<NaiveDate>],
) -> Result<ImportSummary, ImportError> {
    let upload = vintage_repo::insert_upload(conn, batch.created_by.as_deref())?;
    let mut file = vintage_repo::insert_standardized_file(
        conn,
        upload.id,
        &batch.file_name,
        batch.reporting_year,
    )?;
    let mut summary = ImportSummary {
        vintage_id: upload.id,
        reporting_year: batch.reporting_year,
        ..Default::default()
    };

    vintage_repo::advance_status(conn, &mut file, FileStatus::AgencyPending)?;
    if let Some(agency) = batch.responding_agency.as_deref() {
        let agency = vintage_repo::get_or_create_agency(conn, agency)?;
        vintage_repo::insert_source_file(
            conn,
            upload.id,
            agency.id,
            batch.reporting_year,
            None,
            None,
            None,
        )?;
    }

    vintage_repo::advance_status(conn, &mut file, FileStatus::ParentEmployerPending)?;
    let mut units: HashMap<&str, EmployerId> = HashMap::new();
    for record in &batch.records {
        let name = record.employer.trim();
        if units.contains_key(name) {
            continue;
        }
        let (unit, created) = employer_repo::get_or_create_unit(conn, upload.id, name)?;
        summary.units_created += usize::from(created);
        units.insert(name, unit.id);
    }

    vintage_repo::advance_status(conn, &mut file, FileStatus::ChildEmployerPending)?;
    let mut departments: HashMap<(EmployerId, &str), EmployerId> = HashMap::new();
    let mut employer_ids = Vec::with_capacity(batch.records.len());
    for record in &batch.records {
        let unit_id = units[record.employer.trim()];
        let employer_id = match record.department.as_deref().map(str::trim) {
            None | Some("") => unit_id,
            Some(name) => match departments.get(&(unit_id, name)) {
                Some(id) => *id,
                None => {
                    let (department, created) =
                        employer_repo::get_or_create_department(conn, upload.id, unit_id, name)?;
                    summary.departments_created += usize::from(created);
                    departments.insert((unit_id, name), department.id);
                    department.id
                }
            },
        };
        employer_ids.push(employer_id);
    }

    for ((record, employer_id), start_date) in
        batch.records.iter().zip(employer_ids).zip(start_dates)
    {
        let (position, created) = compensation_repo::get_or_create_position(
            conn,
            upload.id,
            employer_id,
            record.title.trim(),
        )?;
        summary.positions_created += usize::from(created);

        let person = compensation_repo::insert_person(
            conn,
            upload.id,
            record.first_name.as_deref(),
            record.last_name.as_deref(),
        )?;
        summary.people_created += 1;

        let job =
            compensation_repo::insert_job(conn, upload.id, person.id, position.id, *start_date)?;
        compensation_repo::insert_salary(conn, upload.id, job.id, record.salary, record.extra_pay)?;
        summary.salaries_created += 1;
    }

    vintage_repo::advance_status(conn, &mut file, FileStatus::Complete)?;
    Ok(summary)
}
