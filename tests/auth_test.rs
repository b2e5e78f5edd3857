mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{body_json, TestApp, PASSWORD};
use pos_backoffice::{build_router, entities::user::Role};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn login_sets_an_http_only_cookie() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "Manager@Shop.test", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("pos_session="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["role"], "manager");
    assert!(body["data"]["user"].get("passwordHash").is_none());
    assert!(body["data"]["expiresAt"].is_string());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new().await;

    let wrong = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "manager@shop.test", "password": "nope-nope" })),
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong = body_json(wrong).await;

    let unknown = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            Some(json!({ "email": "ghost@shop.test", "password": PASSWORD })),
            None,
        )
        .await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown = body_json(unknown).await;

    assert_eq!(wrong["message"], unknown["message"]);
}

#[tokio::test]
async fn session_cookie_authenticates_requests() {
    let app = TestApp::new().await;
    let router = build_router(app.state.clone()).unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/v1/auth/session")
        .header(header::COOKIE, format!("pos_session={}", app.cashier_token))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "cashier@shop.test");
    assert_eq!(body["data"]["role"], "cashier");
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = TestApp::new().await;
    let token = app.login("cashier@shop.test", PASSWORD).await;

    let before = app
        .request(Method::GET, "/api/v1/auth/session", None, Some(&token))
        .await;
    assert_eq!(before.status(), StatusCode::OK);

    let logout = app
        .request(Method::POST, "/api/v1/auth/logout", None, Some(&token))
        .await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);
    let cleared = logout
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cleared.contains("Max-Age=0"));

    let after = app
        .request(Method::GET, "/api/v1/auth/session", None, Some(&token))
        .await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);

    // Other sessions are unaffected.
    let other = app
        .request(
            Method::GET,
            "/api/v1/auth/session",
            None,
            Some(&app.cashier_token),
        )
        .await;
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn garbage_tokens_are_unauthorized() {
    let app = TestApp::new().await;
    let response = app
        .request(
            Method::GET,
            "/api/v1/customers",
            None,
            Some("definitely-not-a-session"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_users_conflict() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .auth
        .create_user(pos_backoffice::auth::NewUser {
            store_id: Some(app.store_id),
            email: "MANAGER@shop.test".to_string(),
            name: "Second manager".to_string(),
            password: PASSWORD.to_string(),
            role: Role::Manager,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        pos_backoffice::errors::ServiceError::Conflict(_)
    ));
}

#[tokio::test]
async fn health_and_status_need_no_session() {
    let app = TestApp::new().await;

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status(), StatusCode::OK);
    let health = body_json(health).await;
    assert_eq!(health["data"]["status"], "up");
    assert_eq!(health["data"]["checks"]["database"], "up");

    let status = app.request(Method::GET, "/status", None, None).await;
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(body_json(status).await["data"]["environment"], "test");

    let docs = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(docs.status(), StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;
    let response = app.request(Method::GET, "/status", None, None).await;
    assert!(response.headers().get("x-request-id").is_some());
}
