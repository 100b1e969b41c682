//! REST API tests through the router

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use smartlib_server::{api, config::AvailabilityPolicy, store::Collection};
use tower::ServiceExt;

use crate::common::{seeded_store, Harness, RecordingNotifier, ADMIN_PASSWORD};

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "admin@library.com", "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn app() -> (Harness, Router) {
    let h = Harness::start(seeded_store(), RecordingNotifier::default(), AvailabilityPolicy::SingleCopy).await;
    let router = api::router(h.state.clone());
    (h, router)
}

#[tokio::test]
async fn test_health_and_readiness() {
    let (_h, app) = app().await;

    let (status, body) = call(&app, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call(&app, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["has_errors"], false);
}

#[tokio::test]
async fn test_login_logout_cycle() {
    let (_h, app) = app().await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "admin@library.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app).await;
    let (status, me) = call(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "admin@library.com");

    let (status, _) = call(&app, Method::POST, "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_require_session() {
    let (_h, app) = app().await;
    let (status, body) = call(&app, Method::GET, "/api/v1/loans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_public_catalog_shows_availability() {
    let (_h, app) = app().await;
    let (status, body) = call(&app, Method::GET, "/api/v1/catalog?q=test", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["New NO."], "B001");
    assert_eq!(body[0]["isAvailable"], true);
    assert_eq!(body[0]["activeLoans"], 0);
}

#[tokio::test]
async fn test_public_catalog_permission_denied() {
    let (h, app) = app().await;
    h.store.deny(Collection::Books);
    let (status, body) = call(&app, Method::GET, "/api/v1/catalog", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "AccessDenied");
}

#[tokio::test]
async fn test_issue_and_return_over_http() {
    let (h, app) = app().await;
    let token = login(&app).await;

    let (status, form) = call(&app, Method::GET, "/api/v1/loans/issuable", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["policy"], "single_copy");
    assert_eq!(form["books"].as_array().unwrap().len(), 1);

    let (status, receipt) = call(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&token),
        Some(json!({
            "bookId": "B001",
            "borrowerId": "S100",
            "borrowerType": "student",
            "dueDate": "2024-01-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["transaction"]["status"], "borrowed");
    assert_eq!(receipt["transaction"]["borrowerEmail"], "asha@college.edu");
    assert_eq!(receipt["notification"]["success"], true);
    let id = receipt["transaction"]["id"].as_str().unwrap().to_string();

    crate::common::eventually(|| !h.library().transactions().is_empty()).await;
    let (_, listed) = call(&app, Method::GET, "/api/v1/loans?status=overdue", Some(&token), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, receipt) = call(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", id),
        Some(&token),
        Some(json!({ "actualReturnDate": "2024-01-20T00:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["performance"], "Late");
    assert_eq!(receipt["transaction"]["status"], "returned");
    assert!(receipt["transaction"]["actualReturnDate"].is_string());
}

#[tokio::test]
async fn test_malformed_return_body_keeps_loan_open() {
    let (h, app) = app().await;
    let token = login(&app).await;

    let (status, receipt) = call(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&token),
        Some(json!({
            "bookId": "B001",
            "borrowerId": "S100",
            "borrowerType": "student",
            "dueDate": "2024-01-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = receipt["transaction"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/loans/{}/return", id);

    let (status, body) = call(
        &app,
        Method::POST,
        &uri,
        Some(&token),
        Some(json!({ "actualReturnDate": 20240120 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");

    // Broken JSON without a content type
    let request = Request::builder()
        .method(Method::POST)
        .uri(&uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from("{\"actualReturnDate\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    crate::common::eventually(|| !h.library().transactions().is_empty()).await;
    let (_, listed) = call(&app, Method::GET, "/api/v1/loans", Some(&token), None).await;
    assert_eq!(listed[0]["status"], "borrowed");
    assert!(listed[0]["actualReturnDate"].is_null());

    // No body at all means returned now
    let (status, receipt) = call(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["transaction"]["status"], "returned");
}

#[tokio::test]
async fn test_issue_unknown_book_is_bad_request() {
    let (h, app) = app().await;
    let token = login(&app).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(&token),
        Some(json!({
            "bookId": "NOPE",
            "borrowerId": "S100",
            "borrowerType": "student",
            "dueDate": "2024-01-15"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert!(h.store.is_empty(Collection::Transactions));
}

#[tokio::test]
async fn test_book_management_and_stats() {
    let (h, app) = app().await;
    let token = login(&app).await;

    let (status, saved) = call(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(&token),
        Some(json!({
            "S.NO": 2,
            "New NO.": "B002",
            "NAME OF THE BOOK": "Second Title",
            "AUTHOR NAME": "B. Writer",
            "PUBLICATION": "Pub House"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["New NO."], "B002");

    crate::common::eventually(|| h.library().books().len() == 2).await;
    let (_, stats) = call(&app, Method::GET, "/api/v1/stats", Some(&token), None).await;
    assert_eq!(stats["total_books"], 2);
    assert_eq!(stats["available"], 2);

    let (status, _) = call(&app, Method::DELETE, "/api/v1/books/B002", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, "/api/v1/books/B002", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_directory() {
    let (_h, app) = app().await;
    let token = login(&app).await;

    let (_, students) = call(&app, Method::GET, "/api/v1/students?program=UG&q=asha", Some(&token), None).await;
    assert_eq!(students.as_array().unwrap().len(), 1);

    let (_, levels) = call(&app, Method::GET, "/api/v1/education-levels?program=UG", Some(&token), None).await;
    assert_eq!(levels, json!(["B.Sc Physics - II"]));

    let (_, staff) = call(&app, Method::GET, "/api/v1/staff", Some(&token), None).await;
    assert_eq!(staff[0]["StaffID"], "T9");
}
