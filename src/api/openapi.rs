//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, health, loans, members, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SmartLib API",
        version = "0.3.0",
        description = "Library portal REST API: catalog, member directory and loans",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::logout,
        auth::me,
        // Books
        books::public_catalog,
        books::list_books,
        books::get_book,
        books::save_book,
        books::delete_book,
        // Members
        members::list_students,
        members::list_staff,
        members::education_levels,
        // Loans
        loans::list_loans,
        loans::issue_form,
        loans::issue_loan,
        loans::return_loan,
        // Stats
        stats::get_stats,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::AdminInfo,
            crate::models::AdminSession,
            // Books
            crate::models::Book,
            crate::models::BookInput,
            crate::services::circulation::BookAvailability,
            // Members
            crate::models::Student,
            crate::models::Staff,
            crate::models::Program,
            crate::models::BorrowerType,
            // Loans
            crate::models::Transaction,
            crate::models::TransactionStatus,
            crate::models::ReturnPerformance,
            crate::config::AvailabilityPolicy,
            crate::services::circulation::StatusFilter,
            crate::services::circulation::TypeFilter,
            crate::services::loans::IssueLoan,
            crate::services::loans::IssueReceipt,
            crate::services::loans::ReturnReceipt,
            crate::services::email::NotificationOutcome,
            crate::services::email::NotificationFailure,
            crate::services::email::FailureKind,
            loans::IssueFormResponse,
            loans::ReturnLoanRequest,
            // Stats
            crate::services::circulation::LibraryStats,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Administrator session"),
        (name = "books", description = "Catalog and book management"),
        (name = "members", description = "Student and staff directory"),
        (name = "loans", description = "Issue and return"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
