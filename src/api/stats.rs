//! Statistics endpoints

use axum::{extract::State, Json};

use crate::{services::circulation::LibraryStats, AppState};

use super::AuthenticatedUser;

/// Dashboard counters
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = LibraryStats)
    )
)]
pub async fn get_stats(State(state): State<AppState>, _admin: AuthenticatedUser) -> Json<LibraryStats> {
    Json(state.services.stats.overview())
}
