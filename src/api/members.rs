//! Member directory endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    models::{Program, Staff, Student},
    services::members::{StaffQuery, StudentQuery},
    AppState,
};

use super::AuthenticatedUser;

#[derive(Debug, Default, Deserialize)]
pub struct EducationQuery {
    pub program: Option<Program>,
}

/// List students
#[utoipa::path(
    get,
    path = "/students",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("q" = Option<String>, Query, description = "Name or registration number"),
        ("program" = Option<Program>, Query, description = "UG or PG"),
        ("education" = Option<String>, Query, description = "Exact education level")
    ),
    responses(
        (status = 200, description = "Students", body = Vec<Student>)
    )
)]
pub async fn list_students(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Query(query): Query<StudentQuery>,
) -> Json<Vec<Student>> {
    Json(state.services.members.students(&query))
}

/// List staff
#[utoipa::path(
    get,
    path = "/staff",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("q" = Option<String>, Query, description = "Name or staff id")
    ),
    responses(
        (status = 200, description = "Staff", body = Vec<Staff>)
    )
)]
pub async fn list_staff(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Query(query): Query<StaffQuery>,
) -> Json<Vec<Staff>> {
    Json(state.services.members.staff(&query))
}

/// Distinct education levels
#[utoipa::path(
    get,
    path = "/education-levels",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("program" = Option<Program>, Query, description = "Restrict to one program")
    ),
    responses(
        (status = 200, description = "Sorted education levels", body = Vec<String>)
    )
)]
pub async fn education_levels(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Query(query): Query<EducationQuery>,
) -> Json<Vec<String>> {
    Json(state.services.members.education_levels(query.program))
}
