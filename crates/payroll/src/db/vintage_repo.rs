//! Vintage repository: uploads, responding agencies and source files.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_date, get_date, get_timestamp, DatabaseError};
use crate::display::unique_slug;
use crate::error::ValidationError;
use crate::model::{
    FileStatus, RespondingAgency, SourceFile, StandardizedFile, Upload, VintageId,
};

fn upload_from_row(row: &Row<'_>) -> Result<Upload, rusqlite::Error> {
    Ok(Upload {
        id: row.get("id")?,
        created_at: get_timestamp(row, "created_at")?,
        created_by: row.get("created_by")?,
    })
}

fn standardized_file_from_row(row: &Row<'_>) -> Result<StandardizedFile, rusqlite::Error> {
    let status: String = row.get("status")?;
    let status = FileStatus::parse(&status).unwrap_or_else(|| {
        log::warn!("Unknown standardized file status '{}', treating as uploaded", status);
        FileStatus::Uploaded
    });

    Ok(StandardizedFile {
        id: row.get("id")?,
        upload_id: row.get("upload_id")?,
        file_name: row.get("file_name")?,
        reporting_year: row.get("reporting_year")?,
        status,
    })
}

fn source_file_from_row(row: &Row<'_>) -> Result<SourceFile, rusqlite::Error> {
    let start = get_date(row, "reporting_period_start")?;
    let end = get_date(row, "reporting_period_end")?;
    Ok(SourceFile {
        id: row.get("id")?,
        upload_id: row.get("upload_id")?,
        responding_agency_id: row.get("responding_agency_id")?,
        reporting_period_start: start.ok_or(rusqlite::Error::InvalidColumnType(
            0,
            "reporting_period_start".to_string(),
            rusqlite::types::Type::Null,
        ))?,
        reporting_period_end: end.ok_or(rusqlite::Error::InvalidColumnType(
            0,
            "reporting_period_end".to_string(),
            rusqlite::types::Type::Null,
        ))?,
        response_date: get_date(row, "response_date")?,
    })
}

/// Creates a new upload event.
pub fn insert_upload(conn: &Connection, created_by: Option<&str>) -> Result<Upload, DatabaseError> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO uploads (created_at, created_by) VALUES (?1, ?2)",
        params![created_at.to_rfc3339(), created_by],
    )?;

    Ok(Upload {
        id: conn.last_insert_rowid(),
        created_at,
        created_by: created_by.map(str::to_string),
    })
}

pub fn find_upload(conn: &Connection, id: VintageId) -> Result<Option<Upload>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM uploads WHERE id = ?1",
            params![id],
            upload_from_row,
        )
        .optional()?)
}

/// Deletes an upload and, through cascades, every row tagged with it.
pub fn delete_upload(conn: &Connection, id: VintageId) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM uploads WHERE id = ?1", params![id])?;
    if deleted > 0 {
        log::info!("Deleted upload {} and its rows", id);
    }
    Ok(deleted > 0)
}

/// Attaches the standardized file for `upload_id`, in the `uploaded` state.
pub fn insert_standardized_file(
    conn: &Connection,
    upload_id: VintageId,
    file_name: &str,
    reporting_year: i32,
) -> Result<StandardizedFile, DatabaseError> {
    let status = FileStatus::Uploaded;
    conn.execute(
        "INSERT INTO standardized_files (upload_id, file_name, reporting_year, status)
         VALUES (?1, ?2, ?3, ?4)",
        params![upload_id, file_name, reporting_year, status.as_str()],
    )?;

    Ok(StandardizedFile {
        id: conn.last_insert_rowid(),
        upload_id,
        file_name: file_name.to_string(),
        reporting_year,
        status,
    })
}

pub fn find_standardized_file(
    conn: &Connection,
    id: i64,
) -> Result<Option<StandardizedFile>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT * FROM standardized_files WHERE id = ?1",
            params![id],
            standardized_file_from_row,
        )
        .optional()?)
}

/// Moves a standardized file to `to` and persists the new status.
pub fn advance_status(
    conn: &Connection,
    file: &mut StandardizedFile,
    to: FileStatus,
) -> Result<(), DatabaseError> {
    let from = file.status;
    file.transition(to)?;
    conn.execute(
        "UPDATE standardized_files SET status = ?2 WHERE id = ?1",
        params![file.id, to.as_str()],
    )?;
    log::debug!("Standardized file {}: '{}' -> '{}'", file.id, from, to);
    Ok(())
}

/// Reporting year of a vintage, via its standardized file.
pub fn reporting_year(conn: &Connection, vintage_id: VintageId) -> Result<Option<i32>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT reporting_year FROM vintage_years WHERE vintage_id = ?1",
            params![vintage_id],
            |r| r.get(0),
        )
        .optional()?)
}

/// Every (vintage, reporting year) pair.
pub fn vintage_years(conn: &Connection) -> Result<Vec<(VintageId, i32)>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT vintage_id, reporting_year FROM vintage_years")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Distinct reporting years with imported salaries, most recent first.
pub fn salary_years(conn: &Connection) -> Result<Vec<i32>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT v.reporting_year
         FROM salaries s JOIN vintage_years v ON v.vintage_id = s.vintage_id
         ORDER BY v.reporting_year DESC",
    )?;
    let rows = stmt
        .query_map([], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Finds an agency by exact name, creating it if needed.
pub fn get_or_create_agency(conn: &Connection, name: &str) -> Result<RespondingAgency, DatabaseError> {
    let existing = conn
        .query_row(
            "SELECT id, name, slug FROM responding_agencies WHERE name = ?1",
            params![name],
            |r| {
                Ok(RespondingAgency {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    slug: r.get(2)?,
                })
            },
        )
        .optional()?;
    if let Some(agency) = existing {
        return Ok(agency);
    }

    let mut slug_check = conn.prepare("SELECT 1 FROM responding_agencies WHERE slug = ?1")?;
    let slug = unique_slug(name, |candidate| {
        slug_check.exists(params![candidate]).unwrap_or(true)
    });
    conn.execute(
        "INSERT INTO responding_agencies (name, slug) VALUES (?1, ?2)",
        params![name, slug],
    )?;

    Ok(RespondingAgency {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        slug,
    })
}

/// Records a source file. Missing period dates default to the bounds of
/// `reporting_year`; the stored reporting year follows the period start.
pub fn insert_source_file(
    conn: &Connection,
    upload_id: VintageId,
    responding_agency_id: i64,
    reporting_year: i32,
    period_start: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
    response_date: Option<NaiveDate>,
) -> Result<SourceFile, DatabaseError> {
    let (start, end) = SourceFile::reporting_period(reporting_year, period_start, period_end)
        .ok_or(ValidationError::UnknownReference {
            kind: "reporting year",
            id: reporting_year as i64,
        })?;

    let mut file = SourceFile {
        id: 0,
        upload_id,
        responding_agency_id,
        reporting_period_start: start,
        reporting_period_end: end,
        response_date,
    };

    conn.execute(
        "INSERT INTO source_files (upload_id, responding_agency_id, reporting_year,
         reporting_period_start, reporting_period_end, response_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            upload_id,
            responding_agency_id,
            file.reporting_year(),
            format_date(start),
            format_date(end),
            response_date.map(format_date),
        ],
    )?;
    file.id = conn.last_insert_rowid();
    Ok(file)
}

pub fn source_files_for_upload(
    conn: &Connection,
    upload_id: VintageId,
) -> Result<Vec<SourceFile>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM source_files WHERE upload_id = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![upload_id], source_file_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    #[test]
    fn test_upload_and_reporting_year() {
        let db = test_db();
        db.with_conn(|conn| {
            let upload = insert_upload(conn, Some("editor"))?;
            assert_eq!(reporting_year(conn, upload.id)?, None);

            insert_standardized_file(conn, upload.id, "2017.json", 2017)?;
            assert_eq!(reporting_year(conn, upload.id)?, Some(2017));
            assert_eq!(vintage_years(conn)?, vec![(upload.id, 2017)]);

            let found = find_upload(conn, upload.id)?.unwrap();
            assert_eq!(found.created_by.as_deref(), Some("editor"));
            assert_eq!(found.to_string(), format!("editor on {}", found.created_at));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_advance_status_persists() {
        let db = test_db();
        db.with_conn(|conn| {
            let upload = insert_upload(conn, None)?;
            let mut file = insert_standardized_file(conn, upload.id, "2018.json", 2018)?;

            advance_status(conn, &mut file, FileStatus::AgencyPending)?;
            let stored = find_standardized_file(conn, file.id)?.unwrap();
            assert_eq!(stored.status, FileStatus::AgencyPending);

            let err = advance_status(conn, &mut file, FileStatus::Complete).unwrap_err();
            assert!(matches!(
                err,
                DatabaseError::Validation(ValidationError::InvalidTransition { .. })
            ));
            let stored = find_standardized_file(conn, file.id)?.unwrap();
            assert_eq!(stored.status, FileStatus::AgencyPending);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_get_or_create_agency_reuses_and_disambiguates_slugs() {
        let db = test_db();
        db.with_conn(|conn| {
            let first = get_or_create_agency(conn, "City of Chicago")?;
            let again = get_or_create_agency(conn, "City of Chicago")?;
            assert_eq!(first, again);

            let lookalike = get_or_create_agency(conn, "City of Chicago!")?;
            assert_ne!(first.id, lookalike.id);
            assert_eq!(lookalike.slug, "city-of-chicago-2");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_source_file_period_defaults() {
        let db = test_db();
        db.with_conn(|conn| {
            let upload = insert_upload(conn, None)?;
            let agency = get_or_create_agency(conn, "Cook County")?;
            insert_source_file(conn, upload.id, agency.id, 2017, None, None, None)?;

            let files = source_files_for_upload(conn, upload.id)?;
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].reporting_year(), 2017);
            assert_eq!(
                files[0].reporting_period_end,
                NaiveDate::from_ymd_opt(2017, 12, 31).unwrap()
            );
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_delete_upload_cascades() {
        let db = test_db();
        db.with_conn(|conn| {
            let upload = insert_upload(conn, None)?;
            insert_standardized_file(conn, upload.id, "2017.json", 2017)?;

            assert!(delete_upload(conn, upload.id)?);
            assert!(!delete_upload(conn, upload.id)?);
            assert_eq!(reporting_year(conn, upload.id)?, None);
            Ok(())
        })
        .unwrap();
    }
}
