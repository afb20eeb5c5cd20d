use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::users::Role;

pub mod migrator;
pub mod repositories;

pub use repositories::category::{Category, CategoryChanges, NewCategory};
pub use repositories::user::{NewUser, User, UserChanges, UserCredentials};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    /// Single-connection in-memory store, used by tests.
    pub async fn in_memory() -> Result<Self> {
        Self::with_pool_options("sqlite::memory:", 1, 1).await
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    // ========== Credential Store ==========

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        self.user_repo().find_by_email(email).await
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<Option<UserCredentials>> {
        self.user_repo().find_by_id(id).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.user_repo().create(new_user).await
    }

    pub async fn update_refresh_token_hash(&self, id: &str, hash: &str) -> Result<bool> {
        self.user_repo().update_refresh_token_hash(id, hash).await
    }

    pub async fn rotate_refresh_token_hash(
        &self,
        id: &str,
        expected: &str,
        hash: &str,
    ) -> Result<bool> {
        self.user_repo()
            .rotate_refresh_token_hash(id, expected, hash)
            .await
    }

    pub async fn clear_refresh_token_hash(&self, id: &str) -> Result<bool> {
        self.user_repo().clear_refresh_token_hash(id).await
    }

    pub async fn get_user_role(&self, id: &str) -> Result<Option<Role>> {
        self.user_repo().get_role(id).await
    }

    // ========== User administration ==========

    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.user_repo().get(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn update_user(&self, id: &str, changes: UserChanges) -> Result<Option<User>> {
        self.user_repo().update(id, changes).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn set_user_role_by_email(&self, email: &str, role: Role) -> Result<bool> {
        self.user_repo().set_role_by_email(email, role).await
    }

    // ========== Categories ==========

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        self.category_repo().get(id).await
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.category_repo().get_by_name(name).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.category_repo().list().await
    }

    pub async fn create_category(&self, category: NewCategory) -> Result<Category> {
        self.category_repo().create(category).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        changes: CategoryChanges,
    ) -> Result<Option<Category>> {
        self.category_repo().update(id, changes).await
    }

    pub async fn delete_category(&self, id: &str) -> Result<bool> {
        self.category_repo().delete(id).await
    }
}

/// Whether a repository error was caused by a UNIQUE constraint.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<DbErr>())
        .any(|e| matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            refresh_token_hash: None,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = Store::in_memory().await.unwrap();

        let user = store.create_user(new_user("a@x.com")).await.unwrap();
        assert_eq!(user.role, Role::User);

        let by_email = store.find_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.user.id, user.id);
        assert_eq!(by_email.password_hash, "hash");
        assert!(by_email.refresh_token_hash.is_none());

        assert!(store.find_user_by_email("b@x.com").await.unwrap().is_none());
        assert!(store.find_user_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = Store::in_memory().await.unwrap();
        store.create_user(new_user("a@x.com")).await.unwrap();

        let err = store.create_user(new_user("a@x.com")).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_refresh_token_hash_lifecycle() {
        let store = Store::in_memory().await.unwrap();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();

        assert!(!store.clear_refresh_token_hash(&user.id).await.unwrap());

        assert!(store.update_refresh_token_hash(&user.id, "h1").await.unwrap());
        assert!(!store
            .rotate_refresh_token_hash(&user.id, "stale", "h2")
            .await
            .unwrap());
        assert!(store
            .rotate_refresh_token_hash(&user.id, "h1", "h2")
            .await
            .unwrap());

        let stored = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token_hash.as_deref(), Some("h2"));

        assert!(store.clear_refresh_token_hash(&user.id).await.unwrap());
        assert!(!store.clear_refresh_token_hash(&user.id).await.unwrap());

        let stored = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.refresh_token_hash.is_none());
    }

    #[tokio::test]
    async fn test_role_changes_are_visible_immediately() {
        let store = Store::in_memory().await.unwrap();
        let user = store.create_user(new_user("a@x.com")).await.unwrap();

        assert!(store.set_user_role_by_email("a@x.com", Role::Admin).await.unwrap());
        assert_eq!(store.get_user_role(&user.id).await.unwrap(), Some(Role::Admin));

        assert!(!store.set_user_role_by_email("b@x.com", Role::Admin).await.unwrap());
        assert_eq!(store.get_user_role("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_category_crud() {
        let store = Store::in_memory().await.unwrap();

        let created = store
            .create_category(NewCategory {
                name: "Coffee".to_string(),
                description: None,
                image: Some("uploads/categories/a.png".to_string()),
            })
            .await
            .unwrap();

        let updated = store
            .update_category(
                &created.id,
                CategoryChanges {
                    description: Some(Some("Hot drinks".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("Hot drinks"));
        assert_eq!(updated.image, created.image);

        let cleared = store
            .update_category(
                &created.id,
                CategoryChanges {
                    description: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.description, None);

        assert!(store.get_category_by_name("Coffee").await.unwrap().is_some());
        assert!(store.delete_category(&created.id).await.unwrap());
        assert!(!store.delete_category(&created.id).await.unwrap());
        assert!(store.list_categories().await.unwrap().is_empty());
    }
}
