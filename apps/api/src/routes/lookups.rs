//! Category and brand handlers.
//!
//! Both are plain name lists, so one set of generic handlers serves both.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::dto::{DeletedResponse, LookupRequest};
use crate::error::{ApiJson, ApiResult};
use crate::services::admin;
use crate::AppState;
use motopos_core::{Brand, Category};
use motopos_db::LookupEntity;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list::<Category>))
        .route("/categories/create", post(create::<Category>))
        .route("/categories/{id}/delete", post(delete::<Category>))
        .route("/brands", get(list::<Brand>))
        .route("/brands/create", post(create::<Brand>))
        .route("/brands/{id}/delete", post(delete::<Brand>))
}

pub async fn list<T>(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<T>>>
where
    T: LookupEntity + Serialize,
{
    Ok(Json(admin::list_lookups::<T>(&state.db).await?))
}

pub async fn create<T>(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LookupRequest>,
) -> ApiResult<Json<T>>
where
    T: LookupEntity + Serialize,
{
    Ok(Json(
        admin::create_lookup::<T>(&state.db, &body.name, body.description).await?,
    ))
}

/// Refused while any product, tombstones included, references the entry.
pub async fn delete<T: LookupEntity>(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    admin::delete_lookup::<T>(&state.db, &id).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}
