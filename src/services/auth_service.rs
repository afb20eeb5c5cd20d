//! Domain service for sessions: signup, signin, logout and refresh rotation.
//!
//! This is the only place that mints tokens for a user or invalidates them.
//! At most one refresh token per user is valid at a time: its hash is stored
//! on the user row and overwritten on every successful signin or refresh.

use thiserror::Error;

use super::tokens::{TokenError, TokenPair};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email is already registered")]
    DuplicateIdentity,

    /// Unknown email and wrong password deliberately share this variant.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access denied")]
    AccessDenied,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Already-validated signup fields.
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Session manager.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Registers a `USER` and opens its first session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateIdentity`] if the email is taken.
    async fn signup(&self, input: SignupInput) -> Result<TokenPair, AuthError>;

    /// Verifies credentials and rotates the stored refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a
    /// wrong password, indistinguishably.
    async fn signin(&self, email: &str, password: &str) -> Result<TokenPair, AuthError>;

    /// Ends the user's session if one is active. Idempotent.
    async fn logout(&self, user_id: &str) -> Result<(), AuthError>;

    /// Exchanges the current refresh token for a new pair. The presented
    /// token is single-use.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessDenied`] if there is no active session or
    /// the token is not the most recently issued one.
    async fn refresh(&self, user_id: &str, refresh_token: &str) -> Result<TokenPair, AuthError>;
}
