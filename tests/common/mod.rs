use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use taskr::config::Config;
use taskr::AppState;

/// Build an app instance backed by a fresh in-memory database.
pub async fn test_app() -> Router {
    let db = taskr::db::init_in_memory()
        .await
        .expect("in-memory database should initialize");
    let state = Arc::new(AppState::new(Config::default(), db));
    taskr::api::create_router(state)
}

/// Send one request to the app. `cookie` is a raw Cookie header value,
/// `body` a JSON payload.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    };

    app.clone()
        .oneshot(request)
        .await
        .expect("request should not fail")
}

/// Send a request with a raw string body claiming to be JSON.
pub async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: &str,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = builder
        .body(Body::from(body.to_string()))
        .expect("request should build");

    app.clone()
        .oneshot(request)
        .await
        .expect("request should not fail")
}

/// Read the response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Extract the `name=value` pair from the first Set-Cookie header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|s| s.to_string())
}

/// Register an account and return its session cookie plus response body.
pub async fn register(app: &Router, email: &str, password: &str) -> (String, Value) {
    let response = send(
        app,
        "POST",
        "/api/v1/users",
        Some(serde_json::json!({
            "email": email,
            "password": password,
            "firstName": "Test",
            "lastName": "User",
        })),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("registration should set a session cookie");
    let body = body_json(response).await;
    (cookie, body)
}
