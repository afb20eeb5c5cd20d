use axum::{
    Json,
    extract::{
        FromRequest, Multipart, Path, Request, State,
        multipart::{Field, MultipartError},
    },
    http::{StatusCode, header},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::validation::{JsonBody, MIN_NAME_LEN, validate_id, validate_min_length};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::{CategoryInfo, CreateCategory, ImageUpload, UpdateCategory};

const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryJson {
    name: Option<String>,
    description: Option<String>,
}

/// Category fields from either a `multipart/form-data` body (with an optional
/// `file` part) or a plain JSON body without an image.
#[derive(Debug, Default)]
pub struct CategoryForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub file: Option<ImageUpload>,
}

impl<S> FromRequest<S> for CategoryForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if !is_multipart {
            let JsonBody(body) = JsonBody::<CategoryJson>::from_request(req, state).await?;
            return Ok(Self {
                name: body.name,
                description: body.description,
                file: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;

        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let field_name = field.name().unwrap_or_default().to_string();
            match field_name.as_str() {
                "name" => form.name = Some(field.text().await.map_err(multipart_error)?),
                "description" => {
                    form.description = Some(field.text().await.map_err(multipart_error)?);
                }
                FILE_FIELD => form.file = read_file(field).await?,
                other => {
                    return Err(ApiError::validation(format!(
                        "property {other} should not exist"
                    )));
                }
            }
        }

        Ok(form)
    }
}

/// Documents the `multipart/form-data` body of the category routes.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CategoryUpload {
    name: Option<String>,
    description: Option<String>,
    /// PNG, JPEG, GIF or WebP image
    #[schema(value_type = Option<String>, format = Binary)]
    file: Option<Vec<u8>>,
}

/// An empty file part (a form submitted without choosing a file) is no file.
async fn read_file(field: Field<'_>) -> Result<Option<ImageUpload>, ApiError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;

    if file_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(ImageUpload {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::validation(err.body_text())
    }
}

fn clean_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

/// A submitted but blank description clears it; an absent one is left alone.
fn description_change(description: Option<String>) -> Option<Option<String>> {
    description.map(|d| clean_description(Some(d)))
}

/// POST /categories
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body(content = CategoryUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Category created", body = CategoryInfo),
        (status = 400, description = "Invalid fields or image type"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Name already taken"),
        (status = 413, description = "Image too large")
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    form: CategoryForm,
) -> Result<(StatusCode, Json<ApiResponse<CategoryInfo>>), ApiError> {
    let name = form
        .name
        .as_deref()
        .ok_or_else(|| ApiError::validation("name must be a string"))
        .and_then(|n| validate_min_length("name", n, MIN_NAME_LEN))?;

    let input = CreateCategory {
        name,
        description: clean_description(form.description),
    };

    let category = state.category_service().create(input, form.file).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

/// GET /categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "All categories", body = Vec<CategoryInfo>),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "No categories")
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<CategoryInfo>>>, ApiError> {
    let categories = state.category_service().find_all().await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// GET /categories/{id}
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    params(("id" = String, Path, description = "Category id (UUID)")),
    responses(
        (status = 200, description = "Category", body = CategoryInfo),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CategoryInfo>>, ApiError> {
    let id = validate_id(&id)?;
    let category = state.category_service().find_one(id).await?;
    Ok(Json(ApiResponse::success(category)))
}

/// PATCH /categories/{id}
///
/// Also accepts a JSON body without an image. A blank `description` clears it.
#[utoipa::path(
    patch,
    path = "/api/v1/categories/{id}",
    params(("id" = String, Path, description = "Category id (UUID)")),
    request_body(content = CategoryUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated category", body = CategoryInfo),
        (status = 400, description = "Invalid fields or image type"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Name already taken"),
        (status = 413, description = "Image too large")
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    form: CategoryForm,
) -> Result<Json<ApiResponse<CategoryInfo>>, ApiError> {
    let id = validate_id(&id)?;

    let changes = UpdateCategory {
        name: form
            .name
            .as_deref()
            .map(|n| validate_min_length("name", n, MIN_NAME_LEN))
            .transpose()?,
        description: description_change(form.description),
    };

    let category = state
        .category_service()
        .update(id, changes, form.file)
        .await?;

    Ok(Json(ApiResponse::success(category)))
}

/// DELETE /categories/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = String, Path, description = "Category id (UUID)")),
    responses(
        (status = 200, description = "Category deleted", body = MessageResponse),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer" = [])),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(&id)?;
    state.category_service().remove(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "Category with ID {id} deleted"
    )))))
}
