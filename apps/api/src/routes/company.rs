//! Company profile handlers.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::AuthUser;
use crate::dto::CompanyRequest;
use crate::error::{ApiJson, ApiResult};
use crate::services::admin;
use crate::AppState;
use motopos_core::Company;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/company", get(get_company).post(create_company))
        .route("/company/update", post(update_company))
}

pub async fn get_company(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Company>> {
    Ok(Json(admin::get_company(&state.db).await?))
}

pub async fn create_company(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CompanyRequest>,
) -> ApiResult<Json<Company>> {
    Ok(Json(admin::create_company(&state.db, body.into()).await?))
}

pub async fn update_company(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CompanyRequest>,
) -> ApiResult<Json<Company>> {
    Ok(Json(admin::update_company(&state.db, body.into()).await?))
}
