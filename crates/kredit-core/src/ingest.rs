//! Invoice ingestion workflow
//!
//! Upload → invoice record → extraction → reconciliation against the user's
//! categories → batch insert.
//!
//! The invoice row is committed before the extractor runs, so a failed
//! extraction still leaves the uploaded invoice on record. Negative amounts
//! (refunds, payments) are skipped and counted in `IngestOutcome`.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::{ExtractionRequest, InvoiceExtractor, DEFAULT_MIME_TYPE};
use crate::db::now_utc;
use crate::error::{Error, Result};
use crate::models::{Invoice, NewSpending, Spending, OTHER_CATEGORY};
use crate::store::{CategoryStore, InvoiceStore, SpendingStore};

/// One uploaded invoice file
#[derive(Debug, Clone)]
pub struct InvoiceUpload {
    pub user_id: i64,
    pub filename: String,
    /// Falls back to `application/pdf`
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Result of a successful ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub invoice: Invoice,
    pub spendings: Vec<Spending>,
    /// Candidates dropped because their amount was negative
    pub skipped_negative: usize,
}

/// Ingest one invoice for a user
///
/// With no extractor configured the invoice is still recorded and an
/// `Extraction` error is returned.
pub async fn ingest_invoice<S, E>(
    store: &S,
    extractor: Option<&E>,
    upload: InvoiceUpload,
) -> Result<IngestOutcome>
where
    S: CategoryStore + InvoiceStore + SpendingStore + Sync,
    E: InvoiceExtractor + ?Sized,
{
    if upload.bytes.is_empty() {
        return Err(Error::EmptyUpload);
    }

    let invoice = store.create_invoice(upload.user_id, &upload.filename)?;
    info!(
        invoice_id = invoice.id,
        user_id = upload.user_id,
        filename = %invoice.filename,
        bytes = upload.bytes.len(),
        "Invoice stored, starting extraction"
    );

    let extractor = match extractor {
        Some(e) => e,
        None => {
            warn!(invoice_id = invoice.id, "No extractor configured");
            return Err(Error::Extraction("extraction service not configured".into()));
        }
    };

    let categories = store.list_categories(upload.user_id)?;
    let mut allowed: Vec<String> = categories.iter().map(|c| c.name.clone()).collect();
    if !allowed.iter().any(|name| name == OTHER_CATEGORY) {
        allowed.push(OTHER_CATEGORY.to_string());
    }
    let category_ids: HashMap<&str, i64> =
        categories.iter().map(|c| (c.name.as_str(), c.id)).collect();
    let fallback_id = category_ids.get(OTHER_CATEGORY).copied();

    let mime_type = upload
        .mime_type
        .as_deref()
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MIME_TYPE);
    let request = ExtractionRequest::new(upload.bytes, mime_type, allowed);

    let candidates = extractor.extract(&request).await.map_err(|e| {
        warn!(
            invoice_id = invoice.id,
            extractor = extractor.name(),
            error = %e,
            "Extraction failed"
        );
        match e {
            Error::Extraction(_) => e,
            other => Error::Extraction(other.to_string()),
        }
    })?;

    // One timestamp for the whole batch
    let import_date = now_utc();
    let mut staged = Vec::with_capacity(candidates.len());
    let mut skipped_negative = 0;

    for candidate in &candidates {
        let amount = candidate.parsed_amount()?;
        if amount < 0.0 {
            skipped_negative += 1;
            continue;
        }
        let date = candidate.parsed_date()?;

        let category_id = candidate
            .category
            .as_deref()
            .and_then(|name| category_ids.get(name).copied())
            .or(fallback_id);

        staged.push(NewSpending {
            id: Uuid::new_v4().to_string(),
            name: candidate.name.clone(),
            date,
            amount,
            category_id,
            import_date,
            invoice_id: invoice.id,
            user_id: upload.user_id,
        });
    }

    if skipped_negative > 0 {
        warn!(
            invoice_id = invoice.id,
            skipped_negative, "Skipped candidates with negative amounts"
        );
    }

    let spendings = store.insert_spendings(&staged)?;

    info!(
        invoice_id = invoice.id,
        extracted = candidates.len(),
        stored = spendings.len(),
        skipped_negative,
        "Invoice processed"
    );

    Ok(IngestOutcome {
        invoice,
        spendings,
        skipped_negative,
    })
}
