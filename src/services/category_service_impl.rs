//! `SeaORM` implementation of the `CategoryService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::db::{CategoryChanges, NewCategory, Store, is_unique_violation};
use crate::services::category_service::{
    CategoryError, CategoryInfo, CategoryService, CreateCategory, UpdateCategory,
};
use crate::services::upload::{ImageUpload, UploadStore};

const IMAGE_SUBDIR: &str = "categories";

pub struct SeaOrmCategoryService {
    store: Store,
    uploads: Arc<UploadStore>,
}

impl SeaOrmCategoryService {
    #[must_use]
    pub const fn new(store: Store, uploads: Arc<UploadStore>) -> Self {
        Self { store, uploads }
    }

    async fn store_image(&self, image: Option<ImageUpload>) -> Result<Option<String>, CategoryError> {
        match image {
            Some(image) => Ok(Some(self.uploads.save(IMAGE_SUBDIR, image).await?)),
            None => Ok(None),
        }
    }

    /// Drops a freshly stored image when the write that referenced it failed.
    async fn discard(&self, image_path: Option<&str>) {
        if let Some(path) = image_path {
            self.uploads.delete(path).await;
        }
    }

    async fn name_taken_by_other(&self, name: &str, id: Option<&str>) -> Result<bool, CategoryError> {
        Ok(self
            .store
            .get_category_by_name(name)
            .await?
            .is_some_and(|c| Some(c.id.as_str()) != id))
    }
}

#[async_trait]
impl CategoryService for SeaOrmCategoryService {
    async fn create(
        &self,
        input: CreateCategory,
        image: Option<ImageUpload>,
    ) -> Result<CategoryInfo, CategoryError> {
        if let Some(image) = &image {
            self.uploads.validate(image)?;
        }

        if self.name_taken_by_other(&input.name, None).await? {
            return Err(CategoryError::duplicate(&input.name));
        }

        let image_path = self.store_image(image).await?;

        let result = self
            .store
            .create_category(NewCategory {
                name: input.name.clone(),
                description: input.description,
                image: image_path.clone(),
            })
            .await;

        match result {
            Ok(category) => {
                info!(category_id = %category.id, name = %category.name, "Category created");
                Ok(CategoryInfo::from(category))
            }
            Err(e) => {
                self.discard(image_path.as_deref()).await;
                if is_unique_violation(&e) {
                    Err(CategoryError::duplicate(&input.name))
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn find_all(&self) -> Result<Vec<CategoryInfo>, CategoryError> {
        let categories = self.store.list_categories().await?;

        if categories.is_empty() {
            return Err(CategoryError::NotFound("No categories found".to_string()));
        }

        Ok(categories.into_iter().map(CategoryInfo::from).collect())
    }

    async fn find_one(&self, id: &str) -> Result<CategoryInfo, CategoryError> {
        self.store
            .get_category(id)
            .await?
            .map(CategoryInfo::from)
            .ok_or_else(|| CategoryError::not_found(id))
    }

    async fn update(
        &self,
        id: &str,
        changes: UpdateCategory,
        image: Option<ImageUpload>,
    ) -> Result<CategoryInfo, CategoryError> {
        if let Some(image) = &image {
            self.uploads.validate(image)?;
        }

        let Some(existing) = self.store.get_category(id).await? else {
            return Err(CategoryError::not_found(id));
        };

        if let Some(name) = &changes.name
            && self.name_taken_by_other(name, Some(id)).await?
        {
            return Err(CategoryError::duplicate(name));
        }

        let new_image = self.store_image(image).await?;

        let result = self
            .store
            .update_category(
                id,
                CategoryChanges {
                    name: changes.name.clone(),
                    description: changes.description,
                    image: new_image.clone(),
                },
            )
            .await;

        let updated = match result {
            Ok(Some(category)) => category,
            Ok(None) => {
                self.discard(new_image.as_deref()).await;
                return Err(CategoryError::not_found(id));
            }
            Err(e) => {
                self.discard(new_image.as_deref()).await;
                if is_unique_violation(&e) {
                    let name = changes.name.unwrap_or(existing.name);
                    return Err(CategoryError::duplicate(&name));
                }
                return Err(e.into());
            }
        };

        if new_image.is_some()
            && let Some(old_image) = existing.image.as_deref()
        {
            self.uploads.delete(old_image).await;
        }

        info!(category_id = %id, "Category updated");
        Ok(CategoryInfo::from(updated))
    }

    async fn remove(&self, id: &str) -> Result<(), CategoryError> {
        let Some(category) = self.store.get_category(id).await? else {
            return Err(CategoryError::not_found(id));
        };

        if !self.store.delete_category(id).await? {
            return Err(CategoryError::not_found(id));
        }

        if let Some(image) = category.image.as_deref() {
            self.uploads.delete(image).await;
        }

        info!(category_id = %id, "Category deleted");
        Ok(())
    }
}
