//! Invoice upload handler

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use kredit_core::ingest::{ingest_invoice, InvoiceUpload};
use kredit_core::models::Invoice;

use crate::{AppError, AppState, AuthUser, MAX_UPLOAD_SIZE};

/// Response for a processed invoice
#[derive(Debug, Serialize)]
pub struct UploadInvoiceResponse {
    pub message: String,
    pub invoice: Invoice,
    pub spendings_count: usize,
    pub skipped_negative: usize,
}

/// POST /api/invoices - Upload an invoice and extract its spendings
///
/// Expects multipart form with:
/// - file: invoice file (required, max 10MB)
pub async fn upload_invoice(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadInvoiceResponse>), AppError> {
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let content_type = field.content_type().map(|s| s.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read file data"))?;

        // Check file size limit
        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::bad_request(&format!(
                "File too large. Maximum size is {} MB",
                MAX_UPLOAD_SIZE / 1024 / 1024
            )));
        }

        file = Some((filename, content_type, bytes.to_vec()));
    }

    let (filename, mime_type, bytes) = file.ok_or_else(|| AppError::bad_request("No file part"))?;
    if filename.trim().is_empty() {
        return Err(AppError::bad_request("No selected file"));
    }

    let upload = InvoiceUpload {
        user_id: user.user_id,
        filename,
        mime_type,
        bytes,
    };

    let outcome = ingest_invoice(&state.db, state.extractor.as_ref(), upload).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadInvoiceResponse {
            message: "Invoice processed successfully".to_string(),
            spendings_count: outcome.spendings.len(),
            skipped_negative: outcome.skipped_negative,
            invoice: outcome.invoice,
        }),
    ))
}
