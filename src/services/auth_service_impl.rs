//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::db::{NewUser, Store, is_unique_violation};
use crate::services::auth_service::{AuthError, AuthService, SignupInput};
use crate::services::password::PasswordHasher;
use crate::services::tokens::{TokenIssuer, TokenPair};

pub struct SeaOrmAuthService {
    store: Store,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, hasher: PasswordHasher, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Mints a pair and overwrites the stored refresh hash (last write wins).
    async fn open_session(&self, user_id: &str, email: &str) -> Result<TokenPair, AuthError> {
        let tokens = self.tokens.issue_pair(user_id, email).await?;
        let hash = self.hasher.hash(&tokens.refresh_token).await?;

        if !self.store.update_refresh_token_hash(user_id, &hash).await? {
            // Deleted between lookup and write.
            return Err(AuthError::AccessDenied);
        }

        Ok(tokens)
    }
}

fn record(event: &'static str, outcome: &'static str) {
    metrics::counter!("auth_events_total", "event" => event, "outcome" => outcome).increment(1);
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(&self, input: SignupInput) -> Result<TokenPair, AuthError> {
        if self.store.find_user_by_email(&input.email).await?.is_some() {
            record("signup", "duplicate");
            return Err(AuthError::DuplicateIdentity);
        }

        // The account and its first session are written in one insert, so a
        // failure anywhere before it leaves no user behind.
        let user_id = uuid::Uuid::new_v4().to_string();
        let password_hash = self.hasher.hash(&input.password).await?;
        let tokens = self.tokens.issue_pair(&user_id, &input.email).await?;
        let refresh_token_hash = self.hasher.hash(&tokens.refresh_token).await?;

        let user = match self
            .store
            .create_user(NewUser {
                id: user_id,
                email: input.email,
                password_hash,
                refresh_token_hash: Some(refresh_token_hash),
                first_name: input.first_name,
                last_name: input.last_name,
            })
            .await
        {
            Ok(user) => user,
            // Lost a race with a concurrent signup for the same email.
            Err(e) if is_unique_violation(&e) => {
                record("signup", "duplicate");
                return Err(AuthError::DuplicateIdentity);
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %user.id, "User signed up");
        record("signup", "success");
        Ok(tokens)
    }

    async fn signin(&self, email: &str, password: &str) -> Result<TokenPair, AuthError> {
        let Some(credentials) = self.store.find_user_by_email(email).await? else {
            self.hasher.verify_dummy(password).await;
            record("signin", "failure");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .hasher
            .verify(password, &credentials.password_hash)
            .await?
        {
            debug!(user_id = %credentials.user.id, "Password mismatch");
            record("signin", "failure");
            return Err(AuthError::InvalidCredentials);
        }

        let user = credentials.user;
        let tokens = self.open_session(&user.id, &user.email).await?;

        info!(user_id = %user.id, "User signed in");
        record("signin", "success");
        Ok(tokens)
    }

    async fn logout(&self, user_id: &str) -> Result<(), AuthError> {
        if self.store.clear_refresh_token_hash(user_id).await? {
            info!(user_id = %user_id, "User logged out");
        } else {
            debug!(user_id = %user_id, "Logout without an active session");
        }

        record("logout", "success");
        Ok(())
    }

    async fn refresh(&self, user_id: &str, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let stored_hash = self
            .store
            .find_user_by_id(user_id)
            .await?
            .and_then(|c| c.refresh_token_hash.map(|hash| (c.user, hash)));

        let Some((user, stored_hash)) = stored_hash else {
            record("refresh", "denied");
            return Err(AuthError::AccessDenied);
        };

        if !self.hasher.verify(refresh_token, &stored_hash).await? {
            debug!(user_id = %user.id, "Stale or foreign refresh token presented");
            record("refresh", "denied");
            return Err(AuthError::AccessDenied);
        }

        let tokens = self.tokens.issue_pair(&user.id, &user.email).await?;
        let new_hash = self.hasher.hash(&tokens.refresh_token).await?;

        // Only rotate away from the hash we verified against; a concurrent
        // refresh or logout that moved it first wins.
        if !self
            .store
            .rotate_refresh_token_hash(&user.id, &stored_hash, &new_hash)
            .await?
        {
            debug!(user_id = %user.id, "Refresh lost a rotation race");
            record("refresh", "denied");
            return Err(AuthError::AccessDenied);
        }

        debug!(user_id = %user.id, "Refresh token rotated");
        record("refresh", "success");
        Ok(tokens)
    }
}
