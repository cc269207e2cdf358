//! Integration tests for registration, login, sessions and role checks.

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::{Duration, Utc};
use common::{response_json, TestApp, PASSWORD};
use pharmacy_api::entities::{user_account, user_session};
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

#[tokio::test]
async fn register_returns_session_and_cookie() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "email": "Jane.Doe@Example.com",
                "password": PASSWORD,
                "first_name": "Jane",
                "last_name": "Doe"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], "jane.doe@example.com");
    assert_eq!(body["data"]["user"]["role"], "customer");
    assert!(body["data"]["user"]["customer_id"].is_string());
    assert_eq!(body["data"]["token"].as_str().map(str::len), Some(48));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;
    app.register_customer("dup@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "email": "DUP@example.com",
                "password": PASSWORD,
                "first_name": "Again",
                "last_name": "Again"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn weak_password_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "email": "weak@example.com",
                "password": "password",
                "first_name": "Weak",
                "last_name": "Password"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new().await;
    app.register_customer("known@example.com").await;

    let wrong_password = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "known@example.com", "password": "Wrong-Pass-1" })),
            None,
        )
        .await;
    let unknown_email = app
        .request(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "nobody@example.com", "password": PASSWORD })),
            None,
        )
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response_json(wrong_password).await,
        response_json(unknown_email).await
    );
}

#[tokio::test]
async fn me_reflects_the_session_owner() {
    let app = TestApp::new().await;
    let customer = app.register_customer("me@example.com").await;

    let response = app
        .request(Method::GET, "/api/auth/me", None, Some(&customer.token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["email"], "me@example.com");
    assert_eq!(
        body["data"]["customer_id"],
        customer.customer_id.to_string()
    );
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new().await;
    let customer = app.register_customer("cookie@example.com").await;
    let cookie = format!("theme=dark; session_token={}", customer.token);

    let response = app
        .request_with_headers(
            Method::GET,
            "/api/auth/me",
            None,
            None,
            &[("cookie", cookie.as_str())],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let app = TestApp::new().await;
    let customer = app.register_customer("bye@example.com").await;

    let response = app
        .request(Method::POST, "/api/auth/logout", None, Some(&customer.token))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(Method::GET, "/api/auth/me", None, Some(&customer.token))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_and_bogus_tokens_are_unauthorized() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_MISSING");

    let response = app
        .request(Method::GET, "/api/auth/me", None, Some("not-a-real-token"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_admins_create_staff() {
    let app = TestApp::new().await;
    let customer = app.register_customer("climber@example.com").await;

    let staff = json!({
        "email": "pharmacist@pharmacy.test",
        "password": PASSWORD,
        "role": "pharmacist"
    });

    let response = app
        .request(
            Method::POST,
            "/api/auth/staff",
            Some(staff.clone()),
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.as_admin(Method::POST, "/api/auth/staff", Some(staff)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["role"], "pharmacist");
    assert!(body["data"]["customer_id"].is_null());

    // The new pharmacist can reach staff routes
    let token = app.login("pharmacist@pharmacy.test", PASSWORD).await;
    let response = app
        .request(Method::GET, "/api/dashboard/summary", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn passwords_need_a_digit_and_must_avoid_the_email() {
    let app = TestApp::new().await;

    for (email, password) in [
        ("horse@example.com", "correcthorse"),
        ("marigold@example.com", "Marigold-2024"),
        ("short@example.com", "Ab1"),
    ] {
        let response = app
            .request(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "email": email,
                    "password": password,
                    "first_name": "Policy",
                    "last_name": "Check"
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{password}");
    }
}

#[tokio::test]
async fn expired_session_is_deleted_and_refused() {
    let app = TestApp::new().await;
    let customer = app.register_customer("stale@example.com").await;
    let account = user_account::Entity::find()
        .filter(user_account::Column::Email.eq(customer.email.as_str()))
        .one(&*app.state.db)
        .await
        .expect("load account")
        .expect("account exists");

    user_session::Entity::update_many()
        .col_expr(
            user_session::Column::ExpiresAt,
            Expr::value(Utc::now() - Duration::minutes(1)),
        )
        .filter(user_session::Column::UserId.eq(account.id))
        .exec(&*app.state.db)
        .await
        .expect("backdate session");

    let response = app
        .request(Method::GET, "/api/auth/me", None, Some(&customer.token))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "AUTH_TOKEN_EXPIRED");

    let remaining = user_session::Entity::find()
        .filter(user_session::Column::UserId.eq(account.id))
        .count(&*app.state.db)
        .await
        .expect("count sessions");
    assert_eq!(remaining, 0);
}
