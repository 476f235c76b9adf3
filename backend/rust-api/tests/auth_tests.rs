use axum::http::StatusCode;
use disasterprep_api::models::UserRole;
use serde_json::json;
use std::sync::atomic::Ordering;

mod common;

#[tokio::test]
async fn test_sign_out_calls_auth_service_once() {
    let app = common::create_test_app().await;
    let (_, token) = app.login("Sam Student", UserRole::Student).await;

    let (status, _) = app
        .request("POST", "/api/v1/auth/sign-out", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.gateway.calls(), 1);
}

#[tokio::test]
async fn test_sign_out_failure_is_bad_gateway() {
    let app = common::create_test_app().await;
    let (_, token) = app.login("Sam Student", UserRole::Student).await;
    app.gateway.fail.store(true, Ordering::SeqCst);

    let (status, body) = app
        .request("POST", "/api/v1/auth/sign-out", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["status"], 502);
    assert_eq!(app.gateway.calls(), 1);
}

#[tokio::test]
async fn test_sign_out_without_token_never_reaches_auth_service() {
    let app = common::create_test_app().await;

    let (status, _) = app
        .request("POST", "/api/v1/auth/sign-out", None, None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.gateway.calls(), 0);
}

#[tokio::test]
async fn test_rejects_tampered_token() {
    let app = common::create_test_app().await;
    let (_, token) = app.login("Sam Student", UserRole::Student).await;
    let tampered = format!("{}x", token);

    let (status, _) = app
        .request("GET", "/api/v1/auth/me", Some(&tampered), None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_profile_and_role() {
    let app = common::create_test_app().await;
    let (id, token) = app.login("Tess Teacher", UserRole::Teacher).await;

    let (status, body) = app
        .request("GET", "/api/v1/auth/me", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], id.to_string());
    assert_eq!(body["profile"]["full_name"], "Tess Teacher");
    assert_eq!(body["role"], "teacher");
}

#[tokio::test]
async fn test_me_without_profile() {
    let app = common::create_test_app().await;
    let token = app.token_for(uuid::Uuid::new_v4());

    let (status, body) = app
        .request("GET", "/api/v1/auth/me", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["profile"].is_null());
    assert!(body["role"].is_null());
}

#[tokio::test]
async fn test_update_own_profile() {
    let app = common::create_test_app().await;
    let (_, token) = app.login("Sam Student", UserRole::Student).await;

    let (status, body) = app
        .request(
            "PATCH",
            "/api/v1/auth/me",
            Some(&token),
            Some(json!({
                "full_name": "Samantha Student",
                "avatar_url": "https://cdn.example.com/sam.png"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Samantha Student");
    assert_eq!(body["avatar_url"], "https://cdn.example.com/sam.png");
    assert_eq!(body["role"], "student");

    let (_, dashboard) = app
        .request("GET", "/api/v1/dashboard", Some(&token), None)
        .await;
    assert_eq!(dashboard["greeting"], "Welcome back, Samantha!");
}

#[tokio::test]
async fn test_update_own_profile_validation() {
    let app = common::create_test_app().await;
    let (_, token) = app.login("Sam Student", UserRole::Student).await;

    let (status, _) = app
        .request(
            "PATCH",
            "/api/v1/auth/me",
            Some(&token),
            Some(json!({ "avatar_url": "not a url" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            "PATCH",
            "/api/v1/auth/me",
            Some(&token),
            Some(json!({ "full_name": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_json_error() {
    let app = common::create_test_app().await;
    let (_, token) = app.login("Sam Student", UserRole::Student).await;

    let (status, body) = app
        .request(
            "PATCH",
            "/api/v1/auth/me",
            Some(&token),
            Some(json!({ "full_name": 42 })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);
    assert!(body["message"].as_str().unwrap().contains("JSON"));
}
