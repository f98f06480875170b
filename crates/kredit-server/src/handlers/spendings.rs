//! Spending query and reassignment handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use kredit_core::models::{MonthFilter, Spending};

use crate::{AppError, AppState, AuthUser};

/// Query parameters for listing spendings
#[derive(Debug, Deserialize)]
pub struct SpendingsQuery {
    /// `YYYY-MM`
    pub month: Option<String>,
}

/// GET /api/spendings - List spendings, newest first
pub async fn list_spendings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<SpendingsQuery>,
) -> Result<Json<Vec<Spending>>, AppError> {
    let filter = params
        .month
        .as_deref()
        .filter(|m| !m.is_empty())
        .map(MonthFilter::parse)
        .transpose()?;

    let spendings = state.db.list_spendings(user.user_id, filter.as_ref())?;
    Ok(Json(spendings))
}

/// Request body for reassigning one spending
#[derive(Debug, Deserialize)]
pub struct UpdateSpendingRequest {
    pub category_name: Option<String>,
}

/// PATCH /api/spendings/:id - Move a spending to another category
pub async fn update_spending(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Spending>, AppError> {
    let req: UpdateSpendingRequest =
        serde_json::from_slice(&body).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let category_name = req
        .category_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::bad_request("category_name is required"))?;

    let spending = state
        .db
        .reassign_spending(user.user_id, &id, &category_name)?;
    Ok(Json(spending))
}

/// Request body for bulk reassignment
#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub spending_ids: Option<Vec<String>>,
    pub category_name: Option<String>,
}

/// Response for bulk reassignment
#[derive(Debug, Serialize)]
pub struct BulkUpdateResponse {
    pub updated_count: usize,
}

/// PATCH /api/spendings - Move many spendings to one category
///
/// Ids that do not exist or belong to another user are skipped.
pub async fn bulk_update_spendings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Bytes,
) -> Result<Json<BulkUpdateResponse>, AppError> {
    let req: BulkUpdateRequest =
        serde_json::from_slice(&body).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let (ids, category_name) = match (req.spending_ids, req.category_name) {
        (Some(ids), Some(name)) if !ids.is_empty() && !name.is_empty() => (ids, name),
        _ => return Err(AppError::bad_request("Invalid request data")),
    };

    let updated_count = state
        .db
        .reassign_spendings(user.user_id, &ids, &category_name)?;
    Ok(Json(BulkUpdateResponse { updated_count }))
}
