//! Fixed-point currency amounts.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// An amount of money in whole cents.
///
/// Pay totals are compared for equality when ranking, so amounts are kept
/// as integers rather than floats.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Parses a dollar amount such as `"45000"`, `"$1,250.5"` or `"-12.75"`.
    ///
    /// Returns `None` for anything with more than two decimal places or
    /// characters other than digits, separators and a leading sign.
    pub fn parse(input: &str) -> Option<Self> {
        let cleaned: String = input
            .trim()
            .chars()
            .filter(|c| *c != ',' && *c != '$' && !c.is_whitespace())
            .collect();

        let (negative, digits) = match cleaned.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, cleaned.as_str()),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if fraction.len() > 2
            || !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().ok()?
        };
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().ok()? * 10,
            _ => fraction.parse().ok()?,
        };

        let cents = whole.checked_mul(100)?.checked_add(fraction)?;
        Some(Self(if negative { -cents } else { cents }))
    }
}

impl Money {
    pub const fn checked_add(self, rhs: Money) -> Option<Money> {
        match self.0.checked_add(rhs.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    pub const fn abs(self) -> Money {
        Money(self.0.saturating_abs())
    }
}

/// Saturates at the `i64` cent bounds.
impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let dollars = (abs / 100).to_string();

        let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
        for (i, c) in dollars.chars().enumerate() {
            if i > 0 && (dollars.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        write!(f, "{}${}.{:02}", sign, grouped, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_formatted() {
        assert_eq!(Money::parse("45000"), Some(Money::from_dollars(45000)));
        assert_eq!(Money::parse("$1,250.5"), Some(Money::from_cents(125050)));
        assert_eq!(Money::parse(" 12.07 "), Some(Money::from_cents(1207)));
        assert_eq!(Money::parse(".5"), Some(Money::from_cents(50)));
        assert_eq!(Money::parse("-3.25"), Some(Money::from_cents(-325)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("."), None);
        assert_eq!(Money::parse("12.345"), None);
        assert_eq!(Money::parse("twelve"), None);
        assert_eq!(Money::parse("1.2.3"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_dollars(45000).to_string(), "$45,000.00");
        assert_eq!(Money::from_cents(99).to_string(), "$0.99");
        assert_eq!(Money::from_cents(123456789).to_string(), "$1,234,567.89");
        assert_eq!(Money::from_cents(-1050).to_string(), "-$10.50");
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money::from_dollars(1), Money::from_cents(50)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(150));
    }

    #[test]
    fn test_addition_saturates() {
        let huge = Money::parse("92233720368547758").unwrap();
        assert_eq!(huge.checked_add(Money::from_dollars(1)), None);
        assert_eq!(huge + Money::from_dollars(1), Money::from_cents(i64::MAX));
        assert_eq!(
            Money::from_cents(i64::MIN) + Money::from_cents(-1),
            Money::from_cents(i64::MIN)
        );
        assert_eq!(Money::from_cents(-250).abs(), Money::from_cents(250));
    }
}
