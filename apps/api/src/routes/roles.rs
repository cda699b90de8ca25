//! Role handlers. System roles can be edited but never deleted or renamed.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::AuthUser;
use crate::dto::{DeletedResponse, RoleRequest};
use crate::error::{ApiJson, ApiResult};
use crate::services::admin;
use crate::AppState;
use motopos_core::Role;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles))
        .route("/roles/create", post(create_role))
        .route("/roles/{id}/update", post(update_role))
        .route("/roles/{id}/delete", post(delete_role))
}

pub async fn list_roles(_user: AuthUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Role>>> {
    Ok(Json(admin::list_roles(&state.db).await?))
}

pub async fn create_role(
    _user: AuthUser,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RoleRequest>,
) -> ApiResult<Json<Role>> {
    Ok(Json(admin::create_role(&state.db, body.into()).await?))
}

pub async fn update_role(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RoleRequest>,
) -> ApiResult<Json<Role>> {
    Ok(Json(admin::update_role(&state.db, &id, body.into()).await?))
}

pub async fn delete_role(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    admin::delete_role(&state.db, &id).await?;
    Ok(Json(DeletedResponse { id, deleted: true }))
}
