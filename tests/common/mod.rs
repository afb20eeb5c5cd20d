#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use coffyman::api::AppState;
use coffyman::config::Config;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret123";
const BOUNDARY: &str = "coffyman-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub dir: PathBuf,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.security.access_token_secret = "test-access-secret".to_string();
    config.security.refresh_token_secret = "test-refresh-secret".to_string();
    config.security.argon2_memory_cost_kib = 64;
    config.security.argon2_time_cost = 1;
    config.uploads.root_path = dir.join("uploads").to_string_lossy().into_owned();
    config.uploads.max_file_size_bytes = 1024;
    config
}

pub async fn spawn_app() -> TestApp {
    let dir = std::env::temp_dir().join(format!("coffyman-api-test-{}", uuid::Uuid::new_v4()));
    let config = test_config(&dir);

    let state = coffyman::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");

    TestApp {
        router: coffyman::api::router(state.clone()),
        state,
        dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    /// Signs up `email` and returns `(access_token, refresh_token)`.
    pub async fn signup(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/api/v1/auth/signup",
                None,
                &json!({
                    "email": email,
                    "password": PASSWORD,
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        tokens(&body)
    }

    pub async fn signin(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(json_request(
                "POST",
                "/api/v1/auth/signin",
                None,
                &json!({ "email": email, "password": PASSWORD }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "signin failed: {body}");
        tokens(&body)
    }

    /// Signs up `email`, promotes it to ADMIN and returns its access token.
    pub async fn admin(&self, email: &str) -> String {
        let (access, _) = self.signup(email).await;
        self.set_role(email, coffyman::entities::users::Role::Admin)
            .await;
        access
    }

    pub async fn set_role(&self, email: &str, role: coffyman::entities::users::Role) {
        assert!(
            self.state
                .store()
                .set_user_role_by_email(email, role)
                .await
                .unwrap()
        );
    }
}

pub fn tokens(body: &Value) -> (String, String) {
    (
        body["data"]["accessToken"].as_str().unwrap().to_string(),
        body["data"]["refreshToken"].as_str().unwrap().to_string(),
    )
}

fn builder(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    builder(method, uri, token).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    builder(method, uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Builds a `multipart/form-data` request with text fields and an optional
/// `file` part given as `(file name, content type, bytes)`.
pub fn multipart_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }

    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    builder(method, uri, token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
