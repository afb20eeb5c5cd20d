//! Domain service for user administration and the caller's own profile.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::db::User;
use crate::entities::users::Role;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl UserError {
    pub(crate) fn not_found(id: &str) -> Self {
        Self::NotFound(format!("User with ID {id} not found"))
    }
}

/// Public view of a user. Never carries password or refresh-token hashes.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Already-validated partial update. `password` is plaintext and gets hashed.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Profile of the authenticated caller, by the token's subject id.
    async fn find_me(&self, user_id: &str) -> Result<UserInfo, UserError>;

    /// # Errors
    ///
    /// Returns [`UserError::NotFound`] when there are no users at all.
    async fn find_all(&self) -> Result<Vec<UserInfo>, UserError>;

    async fn find_one(&self, id: &str) -> Result<UserInfo, UserError>;

    /// # Errors
    ///
    /// Returns [`UserError::Conflict`] if the new email is already taken.
    async fn update(&self, id: &str, changes: UpdateUser) -> Result<UserInfo, UserError>;

    async fn remove(&self, id: &str) -> Result<(), UserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_info_serializes_camel_case_without_secrets() {
        let info = UserInfo {
            id: "1".to_string(),
            email: "a@x.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: None,
            role: Role::Admin,
            created_at: "now".to_string(),
            updated_at: "now".to_string(),
        };

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["role"], "ADMIN");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshTokenHash").is_none());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            UserError::not_found("abc").to_string(),
            "User with ID abc not found"
        );
    }
}
