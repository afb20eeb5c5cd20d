//! Request-time authorization.
//!
//! Every route under the API prefix passes through [`authorization_gate`],
//! which looks the matched route up in an [`AccessPolicy`] table. Public
//! routes go straight through. Everything else needs a valid bearer access
//! token, and routes that declare roles additionally get the caller's role
//! read fresh from the store, so a demotion applies on the very next request.

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{HeaderMap, Method, header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use super::{API_PREFIX, ApiError, AppState};
use crate::entities::users::Role;
use crate::services::TokenKind;

const ADMIN: &[Role] = &[Role::Admin];
const ANY_ROLE: &[Role] = &[Role::Admin, Role::User];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteAccess {
    pub public: bool,

    /// Empty means any authenticated caller.
    pub roles: &'static [Role],
}

impl RouteAccess {
    pub const PUBLIC: Self = Self {
        public: true,
        roles: &[],
    };

    pub const AUTHENTICATED: Self = Self {
        public: false,
        roles: &[],
    };

    #[must_use]
    pub const fn roles(roles: &'static [Role]) -> Self {
        Self {
            public: false,
            roles,
        }
    }
}

/// Method + route template → access rule. Routes are relative to the API
/// prefix and use the router's `{param}` syntax.
pub struct AccessPolicy {
    rules: Vec<(Method, &'static str, RouteAccess)>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(vec![
            (Method::POST, "/auth/signup", RouteAccess::PUBLIC),
            (Method::POST, "/auth/signin", RouteAccess::PUBLIC),
            (Method::POST, "/auth/logout", RouteAccess::AUTHENTICATED),
            // Checked against the refresh secret by the handler instead.
            (Method::POST, "/auth/refresh", RouteAccess::PUBLIC),
            (Method::POST, "/user/me", RouteAccess::roles(ANY_ROLE)),
            (Method::GET, "/user", RouteAccess::roles(ADMIN)),
            (Method::GET, "/user/{id}", RouteAccess::roles(ADMIN)),
            (Method::PATCH, "/user/{id}", RouteAccess::roles(ADMIN)),
            (Method::DELETE, "/user/{id}", RouteAccess::roles(ADMIN)),
            (Method::POST, "/categories", RouteAccess::roles(ADMIN)),
            (Method::GET, "/categories", RouteAccess::AUTHENTICATED),
            (Method::GET, "/categories/{id}", RouteAccess::roles(ADMIN)),
            (Method::PATCH, "/categories/{id}", RouteAccess::roles(ADMIN)),
            (Method::DELETE, "/categories/{id}", RouteAccess::roles(ADMIN)),
            (Method::GET, "/health", RouteAccess::PUBLIC),
            (Method::GET, "/metrics", RouteAccess::roles(ADMIN)),
        ])
    }
}

impl AccessPolicy {
    #[must_use]
    pub const fn new(rules: Vec<(Method, &'static str, RouteAccess)>) -> Self {
        Self { rules }
    }

    /// Unlisted routes are protected with no role requirement.
    #[must_use]
    pub fn lookup(&self, method: &Method, route: &str) -> RouteAccess {
        let route = route.strip_prefix(API_PREFIX).unwrap_or(route);

        self.rules
            .iter()
            .find(|(m, r, _)| m == method && *r == route)
            .map_or(RouteAccess::AUTHENTICATED, |(_, _, access)| *access)
    }
}

/// The verified caller, inserted as a request extension by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: String,

    /// Set only on routes that required a role, since only those look it up.
    /// `None` means "not looked up", never "no role": every user has one.
    /// Handlers that need the role must sit behind a role-gated route.
    pub role: Option<Role>,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::unauthenticated("Authentication required"))
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn authorization_gate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let route = request.extensions().get::<MatchedPath>().map_or_else(
        || request.uri().path().to_string(),
        |path| path.as_str().to_string(),
    );
    let access = state.access_policy.lookup(request.method(), &route);

    if access.public {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthenticated("Missing bearer token"))?;

    let claims = state
        .tokens()
        .verify(TokenKind::Access, token)
        .map_err(|e| {
            debug!(route = %route, error = %e, "Rejected access token");
            ApiError::unauthenticated("Invalid or expired token")
        })?;

    tracing::Span::current().record("user_id", claims.sub.as_str());

    let role = if access.roles.is_empty() {
        None
    } else {
        let role = state
            .store()
            .get_user_role(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthenticated("User no longer exists"))?;

        if !access.roles.contains(&role) {
            debug!(user_id = %claims.sub, role = %role, route = %route, "Role not permitted");
            return Err(ApiError::forbidden());
        }
        Some(role)
    };

    request.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
        role,
    });

    Ok(next.run(request).await)
}
