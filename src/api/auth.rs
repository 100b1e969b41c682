//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, models::AdminSession, AppState};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Signed-in administrator
#[derive(Serialize, ToSchema)]
pub struct AdminInfo {
    pub uid: String,
    pub email: String,
}

/// Sign in as administrator
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = AdminSession),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AdminSession>> {
    let session = state.services.auth.login(&request.email, &request.password)?;
    Ok(Json(session))
}

/// Close the administrator session
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn logout(State(state): State<AppState>, _admin: AuthenticatedUser) -> StatusCode {
    state.services.auth.logout();
    StatusCode::NO_CONTENT
}

/// Current administrator
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Signed-in administrator", body = AdminInfo),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(AuthenticatedUser(claims): AuthenticatedUser) -> Json<AdminInfo> {
    Json(AdminInfo {
        uid: claims.uid,
        email: claims.sub,
    })
}
