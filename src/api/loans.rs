//! Loan endpoints

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::AvailabilityPolicy,
    error::{AppError, AppResult},
    models::{dates, Book, Transaction},
    services::{
        circulation::{StatusFilter, TransactionFilter, TypeFilter},
        loans::{IssueLoan, IssueReceipt, ReturnReceipt},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Data backing the issue form
#[derive(Serialize, ToSchema)]
pub struct IssueFormResponse {
    pub policy: AvailabilityPolicy,
    /// Books that can be issued right now
    pub books: Vec<Book>,
    pub suggested_due_date: DateTime<Utc>,
}

/// Return request; an empty body means "returned now"
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLoanRequest {
    /// Defaults to now
    pub actual_return_date: Option<String>,
}

/// Loan history
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("q" = Option<String>, Query, description = "Book name, borrower name, borrower id or book id"),
        ("status" = Option<StatusFilter>, Query, description = "all, borrowed, returned or overdue"),
        ("type" = Option<TypeFilter>, Query, description = "all, student or staff")
    ),
    responses(
        (status = 200, description = "Loans, newest first", body = Vec<Transaction>)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Query(filter): Query<TransactionFilter>,
) -> Json<Vec<Transaction>> {
    Json(state.services.loans.list(&filter))
}

/// Issue form data
#[utoipa::path(
    get,
    path = "/loans/issuable",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Issuable books and suggested due date", body = IssueFormResponse)
    )
)]
pub async fn issue_form(State(state): State<AppState>, _admin: AuthenticatedUser) -> Json<IssueFormResponse> {
    let loans = &state.services.loans;
    Json(IssueFormResponse {
        policy: loans.policy(),
        books: loans.issuable_books(),
        suggested_due_date: loans.suggested_due_date(),
    })
}

/// Issue a book
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = IssueLoan,
    responses(
        (status = 201, description = "Loan created; notification outcome attached", body = IssueReceipt),
        (status = 400, description = "Unknown book or borrower, or missing due date", body = crate::error::ErrorResponse),
        (status = 503, description = "Library data still loading", body = crate::error::ErrorResponse)
    )
)]
pub async fn issue_loan(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Json(request): Json<IssueLoan>,
) -> AppResult<(StatusCode, Json<IssueReceipt>)> {
    let receipt = state.services.loans.issue(request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Transaction ID")
    ),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Loan closed; performance and notification attached", body = ReturnReceipt),
        (status = 400, description = "Malformed body or return date"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    _admin: AuthenticatedUser,
    Path(id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ReturnReceipt>> {
    let request: ReturnLoanRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ReturnLoanRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid return request: {}", e)))?
    };
    let actual_return_date = match request.actual_return_date.as_deref() {
        Some(value) => dates::parse_instant(value)
            .ok_or_else(|| AppError::Validation(format!("Invalid return date: {}", value)))?,
        None => Utc::now(),
    };

    let receipt = state.services.loans.return_loan(&id, actual_return_date).await?;
    Ok(Json(receipt))
}
