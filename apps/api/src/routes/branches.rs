//! Branch handlers.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::AuthUser;
use crate::dto::{BranchRequest, DeletedResponse};
use crate::error::{ApiJson, ApiResult};
use crate::services::admin;
use crate::AppState;
use motopos_core::Branch;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/branches", get(list_branches))
        .route("/branches/create", post(create_branch))
        .route("/branches/{id}/update", post(update_branch))
        .route("/branches/{id}/toggle", post(toggle_branch))
        .route("/branches/{id}/delete", post(delete_branch))
}

pub async fn list_branches(
    _user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Branch>>> {
    Ok(Json(admin::list_branches(&state.db).await?))
}

pub async fn create_branch(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BranchRequest>,
) -> ApiResult<Json<Branch>> {
    Ok(Json(admin::create_branch(&state.db, body.into()).await?))
}

pub async fn update_branch(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<BranchRequest>,
) -> ApiResult<Json<Branch>> {
    Ok(Json(admin::update_branch(&state.db, &id, body.into()).await?))
}

pub async fn toggle_branch(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Branch>> {
    Ok(Json(admin::toggle_branch(&state.db, &id).await?))
}

/// Refused while live products hold stock at the branch.
pub async fn delete_branch(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    admin::delete_branch(&state.db, &id).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}
