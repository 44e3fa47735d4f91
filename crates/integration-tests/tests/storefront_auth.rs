//! Storefront login flow, end to end through the router and session layer.

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use kawn_integration_tests::{FakeCustomerApi, StorefrontHarness, VALID_CODE};
use kawn_storefront::models::keys;
use serde_json::json;

fn api() -> Arc<FakeCustomerApi> {
    Arc::new(
        FakeCustomerApi::new()
            .with_account(7, "sara@example.com", "correct horse", false)
            .with_account(8, "omar@example.com", "battery staple", true)
            .with_account_on("shop2", 9, "lina@example.com", "other store pw", false),
    )
}

#[tokio::test]
async fn test_unknown_email_login_fails_without_token() {
    let api = api();
    let mut browser = StorefrontHarness::new(Arc::clone(&api));

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "nobody@example.com", "password": "whatever" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_credentials");
    assert_eq!(api.login_calls(), 1);
    assert!(
        !browser
            .session_keys()
            .await
            .contains(&keys::CUSTOMER_TOKEN.to_string())
    );

    let (_, session) = browser.send(Method::GET, "/api/auth/session", None).await;
    assert_eq!(session["state"], "anonymous");
}

#[tokio::test]
async fn test_malformed_email_never_reaches_backend() {
    let api = api();
    let mut browser = StorefrontHarness::new(Arc::clone(&api));

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "not-an-email", "password": "whatever" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_email");
    assert_eq!(api.login_calls(), 0);
}

#[tokio::test]
async fn test_login_writes_token_and_redirects() {
    let mut browser = StorefrontHarness::new(api());

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({
                "email": "sara@example.com",
                "password": "correct horse",
                "returnTo": "/account"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "authenticated");
    assert_eq!(body["redirectTo"], "/account");
    assert!(body.get("crossTenant").is_none());

    let stored = browser.session_keys().await;
    assert!(stored.contains(&keys::CUSTOMER_TOKEN.to_string()));
    assert!(stored.contains(&keys::CUSTOMER_DATA.to_string()));
    assert!(!stored.contains(&keys::ACCESS_TOKEN.to_string()));

    // The response never echoes the token.
    assert!(!body.to_string().contains("tok_7"));

    let (status, me) = browser.send(Method::GET, "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "sara@example.com");
    assert_eq!(me["tenant_subdomain"], "shop1");
}

#[tokio::test]
async fn test_me_requires_login() {
    let mut browser = StorefrontHarness::new(api());

    let (status, _) = browser.send(Method::GET, "/api/auth/me", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_two_factor_stores_no_token_until_code() {
    let mut browser = StorefrontHarness::new(api());

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "omar@example.com", "password": "battery staple" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "two_factor_pending");
    assert!(
        !browser
            .session_keys()
            .await
            .contains(&keys::CUSTOMER_TOKEN.to_string())
    );

    // A wrong code keeps the flow pending and still writes nothing.
    let (status, _) = browser
        .send(
            Method::POST,
            "/api/auth/two-factor",
            Some(json!({ "code": "000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
        !browser
            .session_keys()
            .await
            .contains(&keys::CUSTOMER_TOKEN.to_string())
    );
    let (_, session) = browser.send(Method::GET, "/api/auth/session", None).await;
    assert_eq!(session["state"], "two_factor_pending");

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/two-factor",
            Some(json!({ "code": VALID_CODE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "authenticated");
    assert!(
        browser
            .session_keys()
            .await
            .contains(&keys::CUSTOMER_TOKEN.to_string())
    );
}

#[tokio::test]
async fn test_logout_clears_login_keys() {
    let mut browser = StorefrontHarness::new(api());
    browser
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "sara@example.com", "password": "correct horse" })),
        )
        .await;

    let (status, body) = browser.send(Method::POST, "/api/auth/logout", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "anonymous");

    let stored = browser.session_keys().await;
    assert!(!stored.contains(&keys::CUSTOMER_TOKEN.to_string()));
    assert!(!stored.contains(&keys::CUSTOMER_DATA.to_string()));
}

#[tokio::test]
async fn test_cross_tenant_login_redirects_without_token() {
    let mut browser = StorefrontHarness::new(api());

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({
                "email": "lina@example.com",
                "password": "other store pw",
                "returnTo": "/cart"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["crossTenant"], true);
    assert_eq!(body["state"], "anonymous");
    assert_eq!(
        body["redirectTo"],
        "https://shop2.kawn.com/login?returnTo=%2Fcart"
    );
    assert!(
        !browser
            .session_keys()
            .await
            .contains(&keys::CUSTOMER_TOKEN.to_string())
    );
}

fn signup_body(email: &str) -> serde_json::Value {
    json!({
        "name": "Lina",
        "email": email,
        "password": "long-enough-pw",
        "returnTo": "/account"
    })
}

async fn has_token(browser: &StorefrontHarness) -> bool {
    browser
        .session_keys()
        .await
        .contains(&keys::CUSTOMER_TOKEN.to_string())
}

#[tokio::test]
async fn test_login_after_abandoned_signup() {
    let mut browser = StorefrontHarness::new(api());

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/signup",
            Some(signup_body("new@example.com")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "verification_pending");

    // The customer gives up on the emailed code and logs in instead.
    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "sara@example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "authenticated");
    assert!(has_token(&browser).await);
}

#[tokio::test]
async fn test_signup_verify_and_enrol_two_factor() {
    let mut browser = StorefrontHarness::new(api());

    browser
        .send(
            Method::POST,
            "/api/auth/signup",
            Some(signup_body("new@example.com")),
        )
        .await;

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/verify-email",
            Some(json!({ "code": VALID_CODE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "two_factor_setup_offered");
    assert_eq!(body["customer"]["email"], "new@example.com");
    assert!(!has_token(&browser).await);

    let (status, body) = browser
        .send(Method::POST, "/api/auth/two-factor/setup", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "two_factor_setup_pending");
    assert!(body["twoFactorSetup"]["secret"].is_string());
    assert!(body["twoFactorSetup"]["qrCode"].is_string());

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/two-factor/enable",
            Some(json!({ "code": VALID_CODE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "authenticated");
    assert_eq!(body["redirectTo"], "/account");
    assert_eq!(body["recoveryCodes"], json!(["recovery-1"]));
    assert!(has_token(&browser).await);
}

#[tokio::test]
async fn test_signup_verify_and_skip_two_factor() {
    let mut browser = StorefrontHarness::new(api());

    browser
        .send(
            Method::POST,
            "/api/auth/signup",
            Some(signup_body("new@example.com")),
        )
        .await;
    browser
        .send(
            Method::POST,
            "/api/auth/verify-email",
            Some(json!({ "code": VALID_CODE })),
        )
        .await;

    let (status, body) = browser
        .send(Method::POST, "/api/auth/two-factor/skip", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "authenticated");
    assert!(body.get("recoveryCodes").is_none());
    assert!(has_token(&browser).await);
}

#[tokio::test]
async fn test_signup_awaiting_approval() {
    let api = Arc::new(FakeCustomerApi::new().requiring_approval());
    let mut browser = StorefrontHarness::new(api);

    let (status, body) = browser
        .send(
            Method::POST,
            "/api/auth/signup",
            Some(signup_body("new@example.com")),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "request_pending");
    assert_eq!(body["email"], "new@example.com");
    assert!(!has_token(&browser).await);

    // No flow step continues an approval request.
    let (status, _) = browser
        .send(
            Method::POST,
            "/api/auth/verify-email",
            Some(json!({ "code": VALID_CODE })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
