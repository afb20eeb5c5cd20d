use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::categories;

pub use categories::Model as Category;

pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub image: Option<String>,
}

pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Category>> {
        categories::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query category by ID")
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        categories::Entity::find()
            .filter(categories::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query category by name")
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list categories")
    }

    pub async fn create(&self, category: NewCategory) -> Result<Category> {
        let now = chrono::Utc::now().to_rfc3339();

        categories::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(category.name),
            description: Set(category.description),
            image: Set(category.image),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert category")
    }

    pub async fn update(&self, id: &str, changes: CategoryChanges) -> Result<Option<Category>> {
        let Some(category) = self.get(id).await? else {
            return Ok(None);
        };

        let mut active: categories::ActiveModel = category.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(image) = changes.image {
            active.image = Set(Some(image));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active
            .update(&self.conn)
            .await
            .context("Failed to update category")?;

        Ok(Some(updated))
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = categories::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete category")?;

        Ok(result.rows_affected > 0)
    }
}
