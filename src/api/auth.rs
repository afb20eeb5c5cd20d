use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use super::access::{AuthUser, bearer_token};
use super::validation::{
    JsonBody, MIN_NAME_LEN, validate_email, validate_min_length, validate_password,
};
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::services::{SignupInput, TokenKind, TokenPair};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// A verified refresh token from the `Authorization` header.
///
/// Only the refresh route uses this; it is public to the gate, so the token
/// is checked here against the refresh secret.
#[derive(Debug, Clone)]
pub struct RefreshBearer {
    pub user_id: String,
    pub token: String,
}

impl FromRequestParts<Arc<AppState>> for RefreshBearer {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthenticated("Missing bearer token"))?;

        let claims = state
            .tokens()
            .verify(TokenKind::Refresh, token)
            .map_err(|e| {
                debug!(error = %e, "Rejected refresh token");
                ApiError::unauthenticated("Invalid or expired refresh token")
            })?;

        tracing::Span::current().record("user_id", claims.sub.as_str());

        Ok(Self {
            user_id: claims.sub,
            token: token.to_string(),
        })
    }
}

/// POST /auth/signup
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, session opened", body = TokenPair),
        (status = 400, description = "Invalid signup payload"),
        (status = 409, description = "Email already registered")
    ),
    security(()),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenPair>>), ApiError> {
    let input = SignupInput {
        email: validate_email(&payload.email)?,
        password: validate_password(&payload.password)?.to_string(),
        first_name: validate_min_length("firstName", &payload.first_name, MIN_NAME_LEN)?,
        last_name: validate_min_length("lastName", &payload.last_name, MIN_NAME_LEN)?,
    };

    let tokens = state.auth_service().signup(input).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(tokens))))
}

/// POST /auth/signin
#[utoipa::path(
    post,
    path = "/api/v1/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Session opened", body = TokenPair),
        (status = 400, description = "Invalid signin payload"),
        (status = 401, description = "Invalid credentials")
    ),
    security(()),
    tag = "auth"
)]
pub async fn signin(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<SigninRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    let email = validate_email(&payload.email)?;
    let password = validate_password(&payload.password)?;

    let tokens = state.auth_service().signin(&email, password).await?;

    Ok(Json(ApiResponse::success(tokens)))
}

/// POST /auth/logout
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Session closed", body = MessageResponse),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth_service().logout(&user.id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Logged out successfully",
    ))))
}

/// POST /auth/refresh
///
/// Takes the refresh token, not the access token, as the bearer credential.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Missing or invalid refresh token"),
        (status = 403, description = "Refresh token already rotated or session closed")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    bearer: RefreshBearer,
) -> Result<Json<ApiResponse<TokenPair>>, ApiError> {
    let tokens = state
        .auth_service()
        .refresh(&bearer.user_id, &bearer.token)
        .await?;

    Ok(Json(ApiResponse::success(tokens)))
}
