//! User and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Response DTO that excludes the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub created_at: String,
    pub expires_at: String,
}

/// Registration payload. Fields are optional so that missing ones can be
/// reported per-field instead of failing deserialization wholesale.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Current-user response: the profile plus the session's validity window
/// as unix timestamps.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub exp: i64,
    pub iat: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_uses_camel_case() {
        let user = User {
            id: "u1".to_string(),
            email: "karen@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Karen".to_string(),
            last_name: "Jones".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(json["firstName"], "Karen");
        assert_eq!(json["lastName"], "Jones");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn me_response_flattens_profile() {
        let me = MeResponse {
            user: UserResponse {
                id: "u1".to_string(),
                email: "karen@example.com".to_string(),
                first_name: "Karen".to_string(),
                last_name: "Jones".to_string(),
            },
            exp: 1_700_000_000,
            iat: 1_699_000_000,
        };

        let json = serde_json::to_value(&me).unwrap();
        assert_eq!(json["email"], "karen@example.com");
        assert_eq!(json["exp"], 1_700_000_000);
        assert_eq!(json["iat"], 1_699_000_000);
        assert!(json.get("user").is_none());
    }

    #[test]
    fn create_user_request_rejects_unknown_fields() {
        let result: Result<CreateUserRequest, _> = serde_json::from_str(
            r#"{"email":"a@b.com","password":"x","firstName":"A","lastName":"B","role":"admin"}"#,
        );
        assert!(result.is_err());
    }
}
