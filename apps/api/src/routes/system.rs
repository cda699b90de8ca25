//! Health check and bootstrap.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::dto::InitResponse;
use crate::error::ApiResult;
use crate::services::admin;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/init", get(init))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}

/// Seeds system roles, the admin account and the company profile.
pub async fn init(State(state): State<AppState>) -> ApiResult<Json<InitResponse>> {
    let outcome = admin::initialize(
        &state.db,
        &state.config.admin_username,
        &state.config.admin_password,
    )
    .await?;
    Ok(Json(outcome.into()))
}
