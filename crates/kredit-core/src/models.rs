//! Domain models for Kredit

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the mandatory fallback category every user owns
pub const OTHER_CATEGORY: &str = "Other";

/// Categories created for a user on first login, in display order
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Health & Fitness",
    "Travel",
    "Education",
    "Personal Care",
    OTHER_CATEGORY,
];

/// A login identity. The password hash never leaves the core crate.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A per-user spending bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
}

impl Category {
    pub fn is_fallback(&self) -> bool {
        self.name == OTHER_CATEGORY
    }
}

/// Result of deleting a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCategoryResult {
    pub deleted_category_id: i64,
    /// Spendings reassigned to "Other" before the delete
    pub spendings_moved: usize,
}

/// Metadata for one uploaded invoice file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub filename: String,
    pub upload_date: DateTime<Utc>,
    pub user_id: i64,
}

/// A stored spending line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spending {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub category_id: Option<i64>,
    /// Resolved at read time; "Other" when the category reference is unset
    pub category_name: String,
    pub import_date: DateTime<Utc>,
    pub invoice_id: i64,
    pub user_id: i64,
}

/// A spending staged for insertion
#[derive(Debug, Clone)]
pub struct NewSpending {
    pub id: String,
    pub name: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub import_date: DateTime<Utc>,
    pub invoice_id: i64,
    pub user_id: i64,
}

/// A calendar month, used to filter spendings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthFilter {
    pub year: i32,
    pub month: u32,
}

impl MonthFilter {
    /// Parse a `YYYY-MM` filter. Anything else is a `BadFilter`.
    pub fn parse(s: &str) -> Result<Self> {
        let bad = || Error::BadFilter(s.to_string());

        let (year, month) = s.trim().split_once('-').ok_or_else(bad)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(bad());
        }
        let year: i32 = year.parse().map_err(|_| bad())?;
        let month: u32 = month.parse().map_err(|_| bad())?;

        // Validates the month range as well
        NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(bad)?;

        Ok(Self { year, month })
    }

    /// First day of the month (inclusive)
    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// First day of the following month (exclusive)
    pub fn end(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}
