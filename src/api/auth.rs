//! Session authentication: password hashing, opaque tokens, and the
//! middleware that guards protected routes.
//!
//! Tokens are 32 random bytes, hex-encoded, handed to the client in an
//! HttpOnly cookie. Only their SHA-256 hash is stored, so a leaked
//! database cannot be replayed against the API.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

use crate::api::error::ApiError;
use crate::db::{DbPool, Session};
use crate::AppState;

/// Session token cookie name
pub const SESSION_COOKIE: &str = "taskr_session";

/// Length of a hex-encoded token (32 random bytes)
const TOKEN_LEN: usize = 64;

/// Why a presented session token was rejected
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session cookie")]
    Missing,
    #[error("malformed session token")]
    Malformed,
    #[error("unknown session token")]
    Unknown,
    #[error("session expired")]
    Expired,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            // A single message for every rejection; the reason stays in the logs
            SessionError::Missing
            | SessionError::Malformed
            | SessionError::Unknown
            | SessionError::Expired => ApiError::unauthorized("Authentication required"),
            SessionError::Database(e) => e.into(),
        }
    }
}

/// Authenticated identity attached to the request by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    /// Unix timestamp the session was created at
    pub iat: i64,
    /// Unix timestamp the session expires at
    pub exp: i64,
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create a session for a user and return the raw token
pub async fn create_session(
    pool: &DbPool,
    user_id: &str,
    ttl_hours: i64,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let token_hash = hash_token(&token);

    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(chrono::Duration::hours(ttl_hours))
        .unwrap_or(now)
        .to_rfc3339();

    let session_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(&token_hash)
    .bind(now.to_rfc3339())
    .bind(&expires_at)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Look up a session by raw token, enforcing expiry.
///
/// Expired rows are deleted as they are discovered so the table does not
/// accumulate dead sessions.
pub async fn validate_session(pool: &DbPool, token: &str) -> Result<CurrentUser, SessionError> {
    if token.len() != TOKEN_LEN || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SessionError::Malformed);
    }

    let token_hash = hash_token(token);
    let session: Option<Session> = sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ?")
        .bind(&token_hash)
        .fetch_optional(pool)
        .await?;

    let session = session.ok_or(SessionError::Unknown)?;

    // Unparseable timestamps count as expired, which purges the row
    let exp = DateTime::parse_from_rfc3339(&session.expires_at)
        .map(|t| t.timestamp())
        .unwrap_or(0);

    if exp <= Utc::now().timestamp() {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(&session.id)
            .execute(pool)
            .await?;
        return Err(SessionError::Expired);
    }

    let iat = DateTime::parse_from_rfc3339(&session.created_at)
        .map(|t| t.timestamp())
        .unwrap_or(0);

    Ok(CurrentUser {
        user_id: session.user_id,
        iat,
        exp,
    })
}

/// Delete the session matching a raw token. Revoking a session that is
/// already gone is not an error.
pub async fn revoke_session(pool: &DbPool, token: &str) -> Result<(), sqlx::Error> {
    let token_hash = hash_token(token);
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(&token_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Build the session cookie set on registration and login
pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Build the cookie used to clear the session on logout.
/// Path must match the original cookie or browsers keep the old one.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Middleware guarding protected routes.
///
/// A valid session cookie attaches [`CurrentUser`] to the request
/// extensions; anything else is answered with 401.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(SessionError::Missing)?;

    let current_user = validate_session(&state.db, &token).await.map_err(|err| {
        tracing::debug!("Rejected session token: {}", err);
        err
    })?;

    request.extensions_mut().insert(current_user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    async fn seed_user(pool: &DbPool) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, created_at, updated_at) \
             VALUES (?, ?, 'x', 'Test', 'User', ?, ?)",
        )
        .bind(&id)
        .bind(format!("{}@example.com", id))
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[test]
    fn password_hashing_roundtrip() {
        let hash = hash_password("123456").unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_password("123456", &hash));
        assert!(!verify_password("654321", &hash));
        assert!(!verify_password("123456", "not-a-phc-string"));
    }

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let pool = init_in_memory().await.unwrap();
        let user_id = seed_user(&pool).await;

        let token = create_session(&pool, &user_id, 2).await.unwrap();
        let claims = validate_session(&pool, &token).await.unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.exp - claims.iat, 2 * 3600);

        revoke_session(&pool, &token).await.unwrap();
        assert!(matches!(
            validate_session(&pool, &token).await,
            Err(SessionError::Unknown)
        ));

        // Revoking again is a no-op
        revoke_session(&pool, &token).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_tokens_never_reach_the_database() {
        let pool = init_in_memory().await.unwrap();
        let not_hex = "g".repeat(64);
        let too_short = "a".repeat(63);

        for bad in ["", "short", not_hex.as_str(), too_short.as_str()] {
            assert!(matches!(
                validate_session(&pool, bad).await,
                Err(SessionError::Malformed)
            ));
        }
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_purged() {
        let pool = init_in_memory().await.unwrap();
        let user_id = seed_user(&pool).await;

        // A zero-hour ttl expires immediately
        let token = create_session(&pool, &user_id, 0).await.unwrap();
        assert!(matches!(
            validate_session(&pool, &token).await,
            Err(SessionError::Expired)
        ));

        // The first rejection deleted the row, so the same token is now
        // simply unknown
        assert!(matches!(
            validate_session(&pool, &token).await,
            Err(SessionError::Unknown)
        ));
    }
}
