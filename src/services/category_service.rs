//! Domain service for product categories and their images.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::upload::{ImageUpload, UploadError};
use crate::db::Category;

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CategoryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl CategoryError {
    pub(crate) fn not_found(id: &str) -> Self {
        Self::NotFound(format!("Category with ID {id} not found"))
    }

    pub(crate) fn duplicate(name: &str) -> Self {
        Self::Conflict(format!("Category with name \"{name}\" already exists"))
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Relative path, servable under `/uploads`.
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Category> for CategoryInfo {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            image: category.image,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    /// `None` leaves the description alone, `Some(None)` clears it.
    pub description: Option<Option<String>>,
}

#[async_trait::async_trait]
pub trait CategoryService: Send + Sync {
    /// # Errors
    ///
    /// Returns [`CategoryError::Conflict`] if the name exists; the image is
    /// not kept in that case.
    async fn create(
        &self,
        input: CreateCategory,
        image: Option<ImageUpload>,
    ) -> Result<CategoryInfo, CategoryError>;

    /// # Errors
    ///
    /// Returns [`CategoryError::NotFound`] when there are no categories.
    async fn find_all(&self) -> Result<Vec<CategoryInfo>, CategoryError>;

    async fn find_one(&self, id: &str) -> Result<CategoryInfo, CategoryError>;

    /// A new image replaces the old one, which is deleted from disk.
    async fn update(
        &self,
        id: &str,
        changes: UpdateCategory,
        image: Option<ImageUpload>,
    ) -> Result<CategoryInfo, CategoryError>;

    /// Deletes the row, then its image.
    async fn remove(&self, id: &str) -> Result<(), CategoryError>;
}
