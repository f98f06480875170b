//! Category handlers

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use kredit_core::models::Category;

use crate::{AppError, AppState, AuthUser};

/// GET /api/categories - List the caller's categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = state.db.list_categories(user.user_id)?;
    Ok(Json(categories))
}

/// Request body for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
}

/// POST /api/categories - Create a category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let req: CreateCategoryRequest =
        serde_json::from_slice(&body).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let name = req
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Name is required"))?;

    let category = state.db.create_category(user.user_id, &name)?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Response for DELETE /api/categories/:id
#[derive(Debug, Serialize)]
pub struct DeleteCategoryResponse {
    pub message: String,
    pub spendings_moved: usize,
}

/// DELETE /api/categories/:id - Delete a category, moving its spendings to "Other"
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteCategoryResponse>, AppError> {
    let Path(id) = id.map_err(|_| AppError::bad_request("Invalid category id"))?;
    let result = state.db.delete_category(user.user_id, id)?;

    Ok(Json(DeleteCategoryResponse {
        message: "Category deleted successfully".to_string(),
        spendings_moved: result.spendings_moved,
    }))
}
