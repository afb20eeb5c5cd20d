use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::users::{self, Role};

/// User data returned from repository (without password or refresh-token hashes)
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            role: model.role,
            first_name: model.first_name,
            last_name: model.last_name,
            phone: model.phone,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A user together with the hashes needed to authenticate them.
/// Only the session manager should ever see this.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
    pub refresh_token_hash: Option<String>,
}

impl From<users::Model> for UserCredentials {
    fn from(model: users::Model) -> Self {
        let password_hash = model.password_hash.clone();
        let refresh_token_hash = model.refresh_token_hash.clone();
        Self {
            user: User::from(model),
            password_hash,
            refresh_token_hash,
        }
    }
}

pub struct NewUser {
    /// Chosen by the caller so tokens naming it can be minted before the insert.
    pub id: String,
    pub email: String,
    pub password_hash: String,
    /// Lets signup open the first session in the same insert.
    pub refresh_token_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        Ok(user.map(UserCredentials::from))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<UserCredentials>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        Ok(user.map(UserCredentials::from))
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        Ok(self.find_by_id(id).await?.map(|c| c.user))
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users = users::Entity::find()
            .order_by_asc(users::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        Ok(users.into_iter().map(User::from).collect())
    }

    /// Inserts a new user with the `USER` role.
    ///
    /// A duplicate email surfaces as a unique-constraint error, see
    /// [`crate::db::is_unique_violation`].
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = users::ActiveModel {
            id: Set(new_user.id),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            refresh_token_hash: Set(new_user.refresh_token_hash),
            role: Set(Role::User),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            phone: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert user")?;

        Ok(User::from(model))
    }

    /// Returns `None` if the user does not exist.
    pub async fn update(&self, id: &str, changes: UserChanges) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for update")?
        else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(hash) = changes.password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(Some(phone));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        Ok(Some(User::from(updated)))
    }

    /// Returns `false` if no row was deleted.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }

    /// Current role of the user, `None` if the user does not exist.
    pub async fn get_role(&self, id: &str) -> Result<Option<Role>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user role")?;

        Ok(user.map(|u| u.role))
    }

    pub async fn set_role_by_email(&self, email: &str, role: Role) -> Result<bool> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::Role, Expr::value(role.as_str()))
            .col_expr(
                users::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Email.eq(email))
            .exec(&self.conn)
            .await
            .context("Failed to update user role")?;

        Ok(result.rows_affected > 0)
    }

    /// Unconditionally overwrites the stored refresh-token hash.
    pub async fn update_refresh_token_hash(&self, id: &str, hash: &str) -> Result<bool> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::RefreshTokenHash, Expr::value(hash))
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to store refresh token hash")?;

        Ok(result.rows_affected > 0)
    }

    /// Replaces the refresh-token hash only if it still equals `expected`.
    /// Returns `false` when another rotation or a logout got there first.
    pub async fn rotate_refresh_token_hash(
        &self,
        id: &str,
        expected: &str,
        hash: &str,
    ) -> Result<bool> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::RefreshTokenHash, Expr::value(hash))
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::RefreshTokenHash.eq(expected))
            .exec(&self.conn)
            .await
            .context("Failed to rotate refresh token hash")?;

        Ok(result.rows_affected > 0)
    }

    /// Clears the refresh-token hash if one is set. Returns whether a session
    /// was actually ended.
    pub async fn clear_refresh_token_hash(&self, id: &str) -> Result<bool> {
        let result = users::Entity::update_many()
            .col_expr(
                users::Column::RefreshTokenHash,
                Expr::value(Option::<String>::None),
            )
            .filter(users::Column::Id.eq(id))
            .filter(users::Column::RefreshTokenHash.is_not_null())
            .exec(&self.conn)
            .await
            .context("Failed to clear refresh token hash")?;

        Ok(result.rows_affected > 0)
    }
}
