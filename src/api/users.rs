//! User account endpoints: registration, login, logout, and the
//! current-user lookup.

use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{CreateUserRequest, LoginRequest, MeResponse, User, UserResponse};
use crate::AppState;

use super::auth::{
    clear_session_cookie, create_session, hash_password, revoke_session, session_cookie,
    verify_password, CurrentUser, SESSION_COOKIE,
};
use super::error::{ApiError, ApiJson, ValidationErrorBuilder};
use super::validation::{validate_email, validate_name, validate_password};

/// Validate a CreateUserRequest. Missing fields fail the same checks as
/// empty ones, so each problem is reported against its field.
fn validate_register_request(req: &CreateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_email(req.email.as_deref().unwrap_or_default()) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(req.password.as_deref().unwrap_or_default()) {
        errors.add("password", e);
    }
    if let Err(e) = validate_name(req.first_name.as_deref().unwrap_or_default(), "First name") {
        errors.add("firstName", e);
    }
    if let Err(e) = validate_name(req.last_name.as_deref().unwrap_or_default(), "Last name") {
        errors.add("lastName", e);
    }

    errors.finish()
}

/// Validate a LoginRequest. Only presence is checked; whether the
/// credentials match is the handler's job.
fn validate_login_request(req: &LoginRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if req.email.as_deref().unwrap_or_default().is_empty() {
        errors.add("email", "Email is required");
    }
    if req.password.as_deref().unwrap_or_default().is_empty() {
        errors.add("password", "Password is required");
    }

    errors.finish()
}

/// Register a new account. The response carries a session cookie so the
/// client is signed in immediately.
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    validate_register_request(&req)?;

    // Emails are stored lowercase so lookups are case-insensitive
    let email = req
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let password = req.password.as_deref().unwrap_or_default();
    let first_name = req.first_name.as_deref().unwrap_or_default().trim();
    let last_name = req.last_name.as_deref().unwrap_or_default().trim();

    // Checked up front for a precise message; the UNIQUE index still
    // backstops concurrent registrations
    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict(
            "An account with this email already exists",
        ));
    }

    let password_hash = hash_password(password).map_err(|e| {
        tracing::error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to process registration")
    })?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&email)
    .bind(&password_hash)
    .bind(first_name)
    .bind(last_name)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create user: {}", e);
        if e.to_string().contains("UNIQUE constraint failed") {
            ApiError::conflict("An account with this email already exists")
        } else {
            ApiError::database("Failed to create user")
        }
    })?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!("Registered user {}", user.email);

    let token = create_session(&state.db, &user.id, state.config.auth.session_ttl_hours).await?;
    let jar = jar.add(session_cookie(token));

    Ok((jar, Json(UserResponse::from(user))))
}

/// Start a session for an existing account
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>), ApiError> {
    validate_login_request(&req)?;

    let email = req
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let password = req.password.as_deref().unwrap_or_default();

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;

    // Same answer for a missing account and a wrong password, so the
    // endpoint cannot be used to probe for registered emails
    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
    if !verify_password(password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = create_session(&state.db, &user.id, state.config.auth.session_ttl_hours).await?;
    let jar = jar.add(session_cookie(token));

    tracing::info!("User {} logged in", user.email);

    Ok((jar, Json(UserResponse::from(user))))
}

/// Return the authenticated user's profile along with the session's
/// validity window
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<MeResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&current.user_id)
        .fetch_optional(&state.db)
        .await?;

    // The middleware vouched for the session, so a missing row means
    // the account itself is gone
    let user = user.ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(MeResponse {
        user: UserResponse::from(user),
        exp: current.exp,
        iat: current.iat,
    }))
}

/// End the current session and clear the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        revoke_session(&state.db, cookie.value()).await?;
    }

    let jar = jar.remove(clear_session_cookie());
    Ok((jar, StatusCode::NO_CONTENT))
}
