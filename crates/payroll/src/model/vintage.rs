//! Import bookkeeping: uploads, responding agencies and source files.
//!
//! Every imported employer, person, job and salary row is tagged with the
//! [`Upload`] (vintage) that produced it. A vintage's reporting year comes
//! from the standardized file attached to it.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::VintageId;
use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: VintageId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl fmt::Display for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.created_by {
            Some(user) => write!(f, "{} on {}", user, self.created_at),
            None => write!(f, "{}", self.created_at),
        }
    }
}

/// The agency that answered a records request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondingAgency {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// A raw file received from a responding agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub id: i64,
    pub upload_id: VintageId,
    pub responding_agency_id: i64,
    pub reporting_period_start: NaiveDate,
    pub reporting_period_end: NaiveDate,
    pub response_date: Option<NaiveDate>,
}

impl SourceFile {
    pub fn reporting_year(&self) -> i32 {
        self.reporting_period_start.year()
    }

    /// Fills in a missing reporting period with Jan. 1 and Dec. 31 of
    /// `reporting_year`.
    pub fn reporting_period(
        reporting_year: i32,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let start = match start {
            Some(date) => date,
            None => NaiveDate::from_ymd_opt(reporting_year, 1, 1)?,
        };
        let end = match end {
            Some(date) => date,
            None => NaiveDate::from_ymd_opt(reporting_year, 12, 31)?,
        };
        Some((start, end))
    }
}

/// Review state of a standardized file as it moves through import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded,
    AgencyPending,
    ParentEmployerPending,
    ChildEmployerPending,
    SalaryPending,
    Complete,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploaded => "uploaded",
            FileStatus::AgencyPending => "responding agency unmatched",
            FileStatus::ParentEmployerPending => "parent employer unmatched",
            FileStatus::ChildEmployerPending => "child employer unmatched",
            FileStatus::SalaryPending => "salary unvalidated",
            FileStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(FileStatus::Uploaded),
            "responding agency unmatched" => Some(FileStatus::AgencyPending),
            "parent employer unmatched" => Some(FileStatus::ParentEmployerPending),
            "child employer unmatched" => Some(FileStatus::ChildEmployerPending),
            "salary unvalidated" => Some(FileStatus::SalaryPending),
            "complete" => Some(FileStatus::Complete),
            _ => None,
        }
    }

    /// The only state this one may move to.
    ///
    /// `SalaryPending` is never entered by the import flow and has no
    /// successor.
    pub fn next(&self) -> Option<Self> {
        match self {
            FileStatus::Uploaded => Some(FileStatus::AgencyPending),
            FileStatus::AgencyPending => Some(FileStatus::ParentEmployerPending),
            FileStatus::ParentEmployerPending => Some(FileStatus::ChildEmployerPending),
            FileStatus::ChildEmployerPending => Some(FileStatus::Complete),
            FileStatus::SalaryPending | FileStatus::Complete => None,
        }
    }

    /// Hyphenated status without its last word, e.g. `parent-employer`.
    pub fn review_step(&self) -> String {
        let words: Vec<&str> = self.as_str().split(' ').collect();
        words[..words.len() - 1].join("-")
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A standardized payroll file; one per upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedFile {
    pub id: i64,
    pub upload_id: VintageId,
    pub file_name: String,
    pub reporting_year: i32,
    pub status: FileStatus,
}

impl StandardizedFile {
    /// Moves the file to `to`, which must be the current status's successor.
    pub fn transition(&mut self, to: FileStatus) -> Result<(), ValidationError> {
        if self.status.next() != Some(to) {
            return Err(ValidationError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }

    /// Name of the raw staging table for this file's rows.
    pub fn raw_table_name(&self) -> String {
        format!("raw_payroll_{}", self.id)
    }
}
