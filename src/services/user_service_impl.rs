//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::{Store, UserChanges, is_unique_violation};
use crate::services::password::PasswordHasher;
use crate::services::user_service::{UpdateUser, UserError, UserInfo, UserService};

pub struct SeaOrmUserService {
    store: Store,
    hasher: PasswordHasher,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn find_me(&self, user_id: &str) -> Result<UserInfo, UserError> {
        self.store
            .get_user(user_id)
            .await?
            .map(UserInfo::from)
            .ok_or_else(|| UserError::NotFound("User not found".to_string()))
    }

    async fn find_all(&self) -> Result<Vec<UserInfo>, UserError> {
        let users = self.store.list_users().await?;

        if users.is_empty() {
            return Err(UserError::NotFound("No users found".to_string()));
        }

        Ok(users.into_iter().map(UserInfo::from).collect())
    }

    async fn find_one(&self, id: &str) -> Result<UserInfo, UserError> {
        self.store
            .get_user(id)
            .await?
            .map(UserInfo::from)
            .ok_or_else(|| UserError::not_found(id))
    }

    async fn update(&self, id: &str, changes: UpdateUser) -> Result<UserInfo, UserError> {
        if let Some(email) = &changes.email
            && let Some(existing) = self.store.find_user_by_email(email).await?
            && existing.user.id != id
        {
            return Err(UserError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = match &changes.password {
            Some(password) => Some(self.hasher.hash(password).await?),
            None => None,
        };

        let result = self
            .store
            .update_user(
                id,
                UserChanges {
                    email: changes.email,
                    password_hash,
                    first_name: changes.first_name,
                    last_name: changes.last_name,
                    phone: changes.phone,
                },
            )
            .await;

        let user = match result {
            Ok(Some(user)) => user,
            Ok(None) => return Err(UserError::not_found(id)),
            Err(e) if is_unique_violation(&e) => {
                return Err(UserError::Conflict("Email is already registered".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(user_id = %id, "User updated");
        Ok(UserInfo::from(user))
    }

    async fn remove(&self, id: &str) -> Result<(), UserError> {
        if !self.store.delete_user(id).await? {
            return Err(UserError::not_found(id));
        }

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}
