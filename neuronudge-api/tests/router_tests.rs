/// Router tests that never reach the database
///
/// The app runs over a lazily connected pool pointed at a closed port, so
/// these cover everything decided before storage: authentication, token
/// types, request validation, path parsing and response headers.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{lazy_app, request, send, tokens_for};
use neuronudge_shared::auth::jwt::{create_token, Claims, TokenType};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = lazy_app();

    for (method, uri) in [
        (Method::GET, "/v1/dashboard"),
        (Method::GET, "/v1/tasks"),
        (Method::POST, "/v1/tasks/bulk-delete"),
        (Method::GET, "/v1/profile"),
        (Method::PUT, "/v1/preferences"),
        (Method::GET, "/v1/activity"),
        (Method::POST, "/v1/auth/logout"),
    ] {
        let (status, body) = send(&app, request(method.clone(), uri, None, None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = lazy_app();

    let req = axum::http::Request::builder()
        .uri("/v1/tasks")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_invalid_and_foreign_tokens_rejected() {
    let app = lazy_app();

    let (status, _) = send(&app, request(Method::GET, "/v1/tasks", Some("not.a.jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = create_token(
        &Claims::new(Uuid::new_v4(), TokenType::Access),
        "some-other-secret-that-is-32-bytes-long",
    )
    .unwrap();
    let (status, _) = send(&app, request(Method::GET, "/v1/tasks", Some(&foreign), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = lazy_app();
    let tokens = tokens_for(Uuid::new_v4());

    let (status, _) = send(
        &app,
        request(Method::GET, "/v1/dashboard", Some(&tokens.refresh_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_access_token() {
    let app = lazy_app();
    let tokens = tokens_for(Uuid::new_v4());

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": tokens.refresh_token })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": tokens.access_token })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_runs_before_storage() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "username": "ab",
                "email": "not-an-email",
                "password": "focus2024",
                "confirm_password": "focus2024",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["email", "username"]);
}

#[tokio::test]
async fn test_register_rejects_padded_short_username() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "username": "   ab   ",
                "email": "sam@example.com",
                "password": "focus2024",
                "confirm_password": "focus2024",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "username");
}

#[tokio::test]
async fn test_register_password_rules() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({
                "username": "samr",
                "email": "sam@example.com",
                "password": "password",
                "confirm_password": "different1",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["password", "confirm_password"]);
}

#[tokio::test]
async fn test_login_rejects_malformed_email() {
    let app = lazy_app();

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "nobody", "password": "focus2024" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_task_id_must_be_uuid() {
    let app = lazy_app();
    let tokens = tokens_for(Uuid::new_v4());

    let (status, _) = send(
        &app,
        request(Method::GET, "/v1/tasks/42", Some(&tokens.access_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = lazy_app();

    let (status, _) = send(&app, request(Method::GET, "/v2/tasks", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_on_error_responses() {
    let response = lazy_app()
        .oneshot(request(Method::GET, "/v1/dashboard", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let app = lazy_app();

    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert!(body["pool"]["total_connections"].is_number());
}
