//! Kredit Core Library
//!
//! Shared functionality for the Kredit invoice-based spending tracker:
//! - Database access and schema setup (SQLCipher, pooled)
//! - Per-user categories with a protected "Other" fallback
//! - Pluggable invoice extractors (Gemini, mock)
//! - The invoice ingestion workflow

pub mod ai;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod store;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    ExtractionRequest, ExtractorClient, GeminiBackend, InvoiceExtractor, MockBackend,
    SpendingCandidate, EXTRACTION_CONTRACT_VERSION,
};
pub use db::Database;
pub use error::{Error, Result};
pub use ingest::{ingest_invoice, IngestOutcome, InvoiceUpload};
pub use models::{
    Category, DeleteCategoryResult, Invoice, MonthFilter, Spending, User, DEFAULT_CATEGORIES,
    OTHER_CATEGORY,
};
pub use store::{CategoryStore, InvoiceStore, SpendingStore};
