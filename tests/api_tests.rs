mod common;

use axum::http::{StatusCode, header};
use coffyman::entities::users::Role;
use common::{empty_request, json_request, multipart_request, spawn_app};
use serde_json::json;

const MISSING_ID: &str = "00000000-0000-4000-8000-000000000000";

#[tokio::test]
async fn test_gate_public_and_protected_routes() {
    let app = spawn_app().await;

    let (status, body) = app
        .send(empty_request("GET", "/api/v1/health", None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = app
        .send(empty_request("GET", "/api/v1/categories", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(empty_request("GET", "/api/v1/categories", Some("not.a.jwt")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A refresh token is signed with the other secret.
    let (_, refresh) = app.signup("ada@shop.test").await;
    let (status, _) = app
        .send(empty_request("POST", "/api/v1/user/me", Some(&refresh)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_security_headers() {
    let app = spawn_app().await;

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        empty_request("GET", "/api/v1/health", None),
    )
    .await
    .unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
}

#[tokio::test]
async fn test_api_docs_are_public() {
    let app = spawn_app().await;

    let (status, body) = app
        .send(empty_request("GET", "/api/docs/openapi.json", None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/auth/signup"]["post"].is_object());
    assert!(body["paths"]["/api/v1/categories/{id}"]["patch"].is_object());
    assert_eq!(
        body["components"]["securitySchemes"]["bearer"]["scheme"],
        "bearer"
    );

    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        empty_request("GET", "/api/docs/openapi.json", None),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let csp = response
        .headers()
        .get("content-security-policy")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(csp.contains("default-src 'self'"));
}

#[tokio::test]
async fn test_me_returns_own_profile_without_secrets() {
    let app = spawn_app().await;
    let (access, _) = app.signup("ada@shop.test").await;

    let (status, body) = app
        .send(empty_request("POST", "/api/v1/user/me", Some(&access)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ada@shop.test");
    assert_eq!(body["data"]["firstName"], "Ada");
    assert_eq!(body["data"]["role"], "USER");
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("refreshTokenHash").is_none());
}

#[tokio::test]
async fn test_role_changes_apply_on_next_request() {
    let app = spawn_app().await;
    let (access, _) = app.signup("ada@shop.test").await;

    let (status, body) = app
        .send(empty_request("GET", "/api/v1/user", Some(&access)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden resource");

    // Same token, promoted in the store.
    app.set_role("ada@shop.test", Role::Admin).await;
    let (status, body) = app
        .send(empty_request("GET", "/api/v1/user", Some(&access)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    app.set_role("ada@shop.test", Role::User).await;
    let (status, _) = app
        .send(empty_request("GET", "/api/v1/user", Some(&access)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_user_token_is_rejected_on_role_routes() {
    let app = spawn_app().await;
    let admin = app.admin("admin@shop.test").await;
    let (access, _) = app.signup("bob@shop.test").await;

    let (_, me) = app
        .send(empty_request("POST", "/api/v1/user/me", Some(&access)))
        .await;
    let bob_id = me["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(empty_request(
            "DELETE",
            &format!("/api/v1/user/{bob_id}"),
            Some(&admin),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["message"],
        format!("User with ID {bob_id} deleted")
    );

    let (status, _) = app
        .send(empty_request("POST", "/api/v1/user/me", Some(&access)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_admin_crud() {
    let app = spawn_app().await;
    let admin = app.admin("admin@shop.test").await;
    let (_, _) = app.signup("bob@shop.test").await;

    let (status, body) = app
        .send(empty_request("GET", "/api/v1/user", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    let bob = users
        .iter()
        .find(|u| u["email"] == "bob@shop.test")
        .unwrap();
    let bob_id = bob["id"].as_str().unwrap().to_string();
    let bob_uri = format!("/api/v1/user/{bob_id}");

    let (status, body) = app
        .send(empty_request("GET", &bob_uri, Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lastName"], "Lovelace");

    let (status, _) = app
        .send(empty_request("GET", "/api/v1/user/42", Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(empty_request(
            "GET",
            &format!("/api/v1/user/{MISSING_ID}"),
            Some(&admin),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &bob_uri,
            Some(&admin),
            &json!({ "lastName": "Builder", "phone": "555-0100", "password": "new-secret" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lastName"], "Builder");
    assert_eq!(body["data"]["phone"], "555-0100");

    // The new password is hashed and usable.
    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/v1/auth/signin",
            None,
            &json!({ "email": "bob@shop.test", "password": "new-secret" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(json_request(
            "PATCH",
            &bob_uri,
            Some(&admin),
            &json!({ "email": "admin@shop.test" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(json_request(
            "PATCH",
            &bob_uri,
            Some(&admin),
            &json!({ "role": "ADMIN" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(empty_request("DELETE", &bob_uri, Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(empty_request("DELETE", &bob_uri, Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_lifecycle_with_image() {
    let app = spawn_app().await;
    let admin = app.admin("admin@shop.test").await;
    let (user, _) = app.signup("bob@shop.test").await;

    let (status, _) = app
        .send(empty_request("GET", "/api/v1/categories", Some(&user)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(multipart_request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            &[("name", "Coffee"), ("description", "Hot drinks")],
            Some(("cup.png", "image/png", b"\x89PNG fake image".as_slice())),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["name"], "Coffee");
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let image = body["data"]["image"].as_str().unwrap().to_string();
    assert!(image.starts_with("uploads/categories/"));
    assert!(image.ends_with("-cup.png"));

    let (status, bytes) = app
        .send_raw(empty_request("GET", &format!("/{image}"), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"\x89PNG fake image");

    // Any authenticated caller may list, only admins read one.
    let (status, body) = app
        .send(empty_request("GET", "/api/v1/categories", Some(&user)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let category_uri = format!("/api/v1/categories/{id}");
    let (status, _) = app
        .send(empty_request("GET", &category_uri, Some(&user)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(empty_request("GET", &category_uri, Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Hot drinks");

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &category_uri,
            Some(&admin),
            &json!({ "name": "Coffee & Tea" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Coffee & Tea");
    assert_eq!(body["data"]["image"], image.as_str());
    assert_eq!(body["data"]["description"], "Hot drinks");

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &category_uri,
            Some(&admin),
            &json!({ "description": "" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["description"].is_null());
    assert_eq!(body["data"]["name"], "Coffee & Tea");

    let (status, body) = app
        .send(empty_request("DELETE", &category_uri, Some(&admin)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["message"],
        format!("Category with ID {id} deleted")
    );

    let (status, _) = app
        .send_raw(empty_request("GET", &format!("/{image}"), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_rejections() {
    let app = spawn_app().await;
    let admin = app.admin("admin@shop.test").await;
    let (user, _) = app.signup("bob@shop.test").await;

    let (status, _) = app
        .send(multipart_request(
            "POST",
            "/api/v1/categories",
            Some(&user),
            &[("name", "Coffee")],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(multipart_request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            &[("name", "C")],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(multipart_request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            &[("name", "Menus")],
            Some(("menu.pdf", "application/pdf", b"%PDF-1.7".as_slice())),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let too_big = vec![0_u8; 2048];
    let (status, _) = app
        .send(multipart_request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            &[("name", "Posters")],
            Some(("poster.png", "image/png", too_big.as_slice())),
        ))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = app
        .send(multipart_request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            &[("name", "Coffee")],
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(multipart_request(
            "POST",
            "/api/v1/categories",
            Some(&admin),
            &[("name", "Coffee")],
            Some(("cup.png", "image/png", b"png".as_slice())),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Category with name \"Coffee\" already exists");

    // Nothing from the rejected uploads stayed on disk.
    let stored = std::fs::read_dir(app.state.shared.uploads.root().join("categories"))
        .map(Iterator::count)
        .unwrap_or(0);
    assert_eq!(stored, 0);

    let (status, _) = app
        .send(empty_request(
            "DELETE",
            &format!("/api/v1/categories/{MISSING_ID}"),
            Some(&admin),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_requires_admin() {
    let app = spawn_app().await;
    let admin = app.admin("admin@shop.test").await;
    let (user, _) = app.signup("bob@shop.test").await;

    let (status, _) = app
        .send(empty_request("GET", "/api/v1/metrics", Some(&user)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = axum::http::Request::builder()
        .uri("/api/v1/metrics")
        .header(header::AUTHORIZATION, format!("Bearer {admin}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = app.send_raw(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "Metrics not enabled or failed to initialize"
    );
}
