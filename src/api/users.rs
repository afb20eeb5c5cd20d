use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::access::AuthUser;
use super::validation::{
    JsonBody, MIN_NAME_LEN, validate_email, validate_id, validate_min_length, validate_password,
};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::{UpdateUser, UserInfo};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

impl UpdateUserRequest {
    fn validate(self) -> Result<UpdateUser, ApiError> {
        Ok(UpdateUser {
            email: self.email.as_deref().map(validate_email).transpose()?,
            password: self
                .password
                .as_deref()
                .map(|p| validate_password(p).map(str::to_string))
                .transpose()?,
            first_name: self
                .first_name
                .as_deref()
                .map(|v| validate_min_length("firstName", v, MIN_NAME_LEN))
                .transpose()?,
            last_name: self
                .last_name
                .as_deref()
                .map(|v| validate_min_length("lastName", v, MIN_NAME_LEN))
                .transpose()?,
            phone: self.phone.map(|p| p.trim().to_string()),
        })
    }
}

/// POST /user/me
#[utoipa::path(
    post,
    path = "/api/v1/user/me",
    responses(
        (status = 200, description = "Caller's profile", body = UserInfo),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let info = state.user_service().find_me(&user.id).await?;
    Ok(Json(ApiResponse::success(info)))
}

/// GET /user
#[utoipa::path(
    get,
    path = "/api/v1/user",
    responses(
        (status = 200, description = "All users", body = Vec<UserInfo>),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "No users")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ApiError> {
    let users = state.user_service().find_all().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// GET /user/{id}
#[utoipa::path(
    get,
    path = "/api/v1/user/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User", body = UserInfo),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let id = validate_id(&id)?;
    let user = state.user_service().find_one(id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PATCH /user/{id}
#[utoipa::path(
    patch,
    path = "/api/v1/user/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserInfo),
        (status = 400, description = "Invalid update payload"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let id = validate_id(&id)?;
    let changes = payload.validate()?;

    let user = state.user_service().update(id, changes).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /user/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/user/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Malformed id"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(&id)?;
    state.user_service().remove(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "User with ID {id} deleted"
    )))))
}
