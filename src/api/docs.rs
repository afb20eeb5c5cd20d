use axum::Router;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::auth::{SigninRequest, SignupRequest};
use super::categories::CategoryUpload;
use super::observability::HealthResponse;
use super::users::UpdateUserRequest;
use super::MessageResponse;
use crate::entities::users::Role;
use crate::services::{CategoryInfo, TokenPair, UserInfo};

pub const DOCS_PATH: &str = "/api/docs";
pub const OPENAPI_JSON_PATH: &str = "/api/docs/openapi.json";

pub const BEARER_SCHEME: &str = "bearer";

#[derive(OpenApi)]
#[openapi(
    info(title = "Coffyman API"),
    paths(
        super::auth::signup,
        super::auth::signin,
        super::auth::logout,
        super::auth::refresh,
        super::users::me,
        super::users::list_users,
        super::users::get_user,
        super::users::update_user,
        super::users::delete_user,
        super::categories::create_category,
        super::categories::list_categories,
        super::categories::get_category,
        super::categories::update_category,
        super::categories::delete_category,
        super::observability::health
    ),
    components(schemas(
        SignupRequest,
        SigninRequest,
        TokenPair,
        MessageResponse,
        UserInfo,
        UpdateUserRequest,
        Role,
        CategoryInfo,
        CategoryUpload,
        HealthResponse
    )),
    tags(
        (name = "auth", description = "Signup, signin and token rotation"),
        (name = "users", description = "Own profile and user administration"),
        (name = "categories", description = "Product categories and their images"),
        (name = "system", description = "Health")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Swagger UI at [`DOCS_PATH`]. The entered bearer token survives page reloads.
pub fn docs_router() -> Router {
    let config = utoipa_swagger_ui::Config::default().persist_authorization(true);

    SwaggerUi::new(DOCS_PATH)
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .config(config)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_endpoint() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        for path in [
            "/api/v1/auth/signup",
            "/api/v1/auth/signin",
            "/api/v1/auth/logout",
            "/api/v1/auth/refresh",
            "/api/v1/user/me",
            "/api/v1/user",
            "/api/v1/user/{id}",
            "/api/v1/categories",
            "/api/v1/categories/{id}",
            "/api/v1/health",
        ] {
            assert!(paths.contains_key(path), "Missing {path}");
        }
    }

    #[test]
    fn test_openapi_declares_bearer_scheme() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components");

        assert!(components.security_schemes.contains_key(BEARER_SCHEME));
        for schema in ["TokenPair", "UserInfo", "CategoryInfo", "Role"] {
            assert!(components.schemas.contains_key(schema), "Missing {schema}");
        }
    }
}
