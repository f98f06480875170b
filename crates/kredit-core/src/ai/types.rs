//! Extraction contract types
//!
//! These types are provider-agnostic and used across all extractor implementations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version of the request/response contract between the ingestion workflow
/// and any extractor. Bump when fields change meaning.
pub const EXTRACTION_CONTRACT_VERSION: u32 = 1;

/// MIME type sent when the upload carries none
pub const DEFAULT_MIME_TYPE: &str = "application/pdf";

/// Input to one extraction call
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub contract_version: u32,
    pub file_bytes: Vec<u8>,
    pub mime_type: String,
    /// Category names the extractor may assign; always contains "Other"
    pub allowed_categories: Vec<String>,
}

impl ExtractionRequest {
    pub fn new(file_bytes: Vec<u8>, mime_type: &str, allowed_categories: Vec<String>) -> Self {
        Self {
            contract_version: EXTRACTION_CONTRACT_VERSION,
            file_bytes,
            mime_type: mime_type.to_string(),
            allowed_categories,
        }
    }
}

/// An amount as models emit it: usually a number, sometimes a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateAmount {
    Number(f64),
    Text(String),
}

impl CandidateAmount {
    pub fn value(&self) -> Result<f64> {
        match self {
            CandidateAmount::Number(n) => Ok(*n),
            CandidateAmount::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::Extraction(format!("Invalid amount '{}'", s))),
        }
    }
}

impl From<f64> for CandidateAmount {
    fn from(n: f64) -> Self {
        CandidateAmount::Number(n)
    }
}

/// One spending line proposed by an extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingCandidate {
    pub name: String,
    /// Category guess; resolved against the user's categories, "Other" when absent
    #[serde(default)]
    pub category: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    pub amount: CandidateAmount,
}

impl SpendingCandidate {
    pub fn new(name: &str, category: Option<&str>, date: &str, amount: f64) -> Self {
        Self {
            name: name.to_string(),
            category: category.map(str::to_string),
            date: date.to_string(),
            amount: CandidateAmount::Number(amount),
        }
    }

    pub fn parsed_date(&self) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            Error::Extraction(format!("Invalid date '{}' for '{}'", self.date, self.name))
        })
    }

    pub fn parsed_amount(&self) -> Result<f64> {
        let amount = self.amount.value()?;
        if !amount.is_finite() {
            return Err(Error::Extraction(format!(
                "Invalid amount for '{}'",
                self.name
            )));
        }
        Ok(amount)
    }
}
