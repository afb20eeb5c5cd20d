use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use super::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;

pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim();

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::validation("email must be an email"));
    };

    let domain_ok = domain
        .split('.')
        .all(|label| !label.is_empty() && !label.starts_with('-') && !label.ends_with('-'))
        && domain.contains('.');

    if local.is_empty()
        || !domain_ok
        || email.len() > 254
        || email.chars().any(|c| c.is_whitespace() || c == ',')
        || domain.contains('@')
    {
        return Err(ApiError::validation("email must be an email"));
    }

    Ok(email.to_string())
}

pub fn validate_password(password: &str) -> Result<&str, ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be longer than or equal to {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(password)
}

/// Trims and checks a minimum length, naming the field in the message.
pub fn validate_min_length(field: &str, value: &str, min: usize) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.chars().count() < min {
        return Err(ApiError::validation(format!(
            "{field} must be longer than or equal to {min} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_id(id: &str) -> Result<&str, ApiError> {
    if uuid::Uuid::parse_str(id).is_err() {
        return Err(ApiError::validation(format!(
            "Validation failed (uuid is expected): {id}"
        )));
    }
    Ok(id)
}

/// `Json` whose rejections (bad syntax, unknown or missing fields) surface
/// as 400 validation errors in the API envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| ApiError::validation(rejection.body_text()))
    }
}
