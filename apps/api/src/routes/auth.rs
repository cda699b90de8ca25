//! Login and session lookup.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::AuthUser;
use crate::dto::{LoginRequest, LoginResponse, MeResponse, UserDto};
use crate::error::{ApiJson, ApiResult};
use crate::services::admin;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

/// Exchanges username and password for a bearer token.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = admin::authenticate(&state.db, &body.username, &body.password).await?;
    let token = state.jwt.issue(&user)?;
    let (user, role) = admin::current_user(&state.db, &user.id).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserDto::new(user, Some(role)),
    }))
}

pub async fn me(
    AuthUser(claims): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<MeResponse>> {
    let (user, role) = admin::current_user(&state.db, &claims.sub).await?;
    Ok(Json(MeResponse {
        user: UserDto::new(user, Some(role)),
    }))
}
