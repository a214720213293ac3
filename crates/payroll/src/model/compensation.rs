//! People, positions, jobs and salaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{EmployerId, JobId, Money, PersonId, PositionId, SalaryId, VintageId};
use crate::error::ValidationError;

/// Amounts below this are taken to be hourly or per-appearance rates.
pub const WAGE_THRESHOLD: Money = Money::from_dollars(1000);

/// Largest base amount or extra pay a salary may carry.
pub const MAX_PAY: Money = Money::from_dollars(10_000_000_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub vintage_id: VintageId,
    pub slug: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Ask search engines not to index this person's page.
    pub noindex: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: PositionId,
    pub vintage_id: VintageId,
    pub employer_id: EmployerId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub vintage_id: VintageId,
    pub person_id: PersonId,
    pub position_id: PositionId,
    pub start_date: Option<NaiveDate>,
}

/// Prospective annual pay for a job in one reporting year.
///
/// `amount` is the base rate the employer expects to pay; `extra_pay`
/// covers overtime and bonuses. Some amounts are hourly or per-appearance
/// rates, which payroll filings do not flag explicitly (see [`Salary::is_wage`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    pub id: SalaryId,
    pub vintage_id: VintageId,
    pub job_id: JobId,
    pub amount: Option<Money>,
    pub extra_pay: Option<Money>,
}

impl Salary {
    /// Base amount plus extra pay, counting missing parts as zero.
    pub fn total_pay(&self) -> Money {
        total_pay(self.amount, self.extra_pay)
    }

    pub fn is_wage(&self) -> bool {
        self.amount.is_some_and(|amount| amount < WAGE_THRESHOLD)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_pay(self.job_id, self.amount, self.extra_pay)
    }
}

pub fn total_pay(amount: Option<Money>, extra_pay: Option<Money>) -> Money {
    amount.unwrap_or_default() + extra_pay.unwrap_or_default()
}

pub fn validate_pay(
    job_id: JobId,
    amount: Option<Money>,
    extra_pay: Option<Money>,
) -> Result<(), ValidationError> {
    if amount.is_none() && extra_pay.is_none() {
        return Err(ValidationError::MissingPay { job_id });
    }
    if let Some(amount) = [amount, extra_pay]
        .into_iter()
        .flatten()
        .find(|part| part.abs() > MAX_PAY)
    {
        return Err(ValidationError::PayOutOfRange { job_id, amount });
    }
    Ok(())
}
