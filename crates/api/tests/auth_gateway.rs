//! Integration tests for the request authorization pipeline.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::routing::get as get_route;
use axum::Router;
use common::{body_json, body_text, get, send, token_for, CountingBackend, FailingBackend};
use jsonwebtoken::{encode, EncodingKey, Header};
use memcard_api::auth::jwt::Claims;
use memcard_api::error::INTERNAL_ERROR_MESSAGE;
use memcard_api::middleware::auth::AuthContext;
use memcard_api::router::app_routes;
use memcard_api::state::AppState;
use memcard_core::types::UserId;
use serde_json::json;
use tower::ServiceExt;

/// Every endpoint that requires authentication.
const PROTECTED: &[(&str, &str)] = &[
    ("GET", "/api/v1/profile"),
    ("PUT", "/api/v1/profile"),
    ("GET", "/api/v1/collection"),
    ("POST", "/api/v1/collection"),
    ("DELETE", "/api/v1/collection/1"),
    ("GET", "/api/v1/collection/total"),
    ("GET", "/api/v1/collection/prices"),
    ("GET", "/api/v1/friends"),
    ("POST", "/api/v1/friends/6f1c1a44-9a63-4a57-a3f5-1f2d0f3a9b10/request"),
    ("POST", "/api/v1/friends/6f1c1a44-9a63-4a57-a3f5-1f2d0f3a9b10/accept"),
    ("DELETE", "/api/v1/friends/6f1c1a44-9a63-4a57-a3f5-1f2d0f3a9b10"),
    ("GET", "/api/v1/notifications"),
    ("POST", "/api/v1/notifications/achievement"),
    ("POST", "/api/v1/notifications/friend"),
    ("POST", "/api/v1/notifications/1/validate"),
    ("DELETE", "/api/v1/account"),
    ("POST", "/api/v1/quiz"),
];

// ---------------------------------------------------------------------------
// Test: missing credential -> 401 and the data service is never called
// ---------------------------------------------------------------------------

#[tokio::test]
async fn protected_endpoints_reject_missing_credential_without_side_effects() {
    let backend = Arc::new(CountingBackend::new());

    for (method, uri) in PROTECTED {
        let app = common::build_test_app(backend.clone());
        let method: Method = method.parse().unwrap();
        let body = matches!(method, Method::POST | Method::PUT).then(|| json!({}));

        let response = send(app, method.clone(), uri, None, body).await;

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{method} {uri} must require authentication"
        );
        let json = body_json(response).await;
        assert_eq!(json["code"], "UNAUTHORIZED");
    }

    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn handler_body_never_runs_without_credential() {
    let executed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&executed);
    let routes: Router<AppState> = Router::new().route(
        "/guarded",
        get_route(move |_auth: AuthContext| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                "ran"
            }
        }),
    );
    let app = common::build_test_app_with(routes, Arc::new(CountingBackend::new()), None);

    let response = get(app.clone(), "/guarded", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = get(app.clone(), "/guarded", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(executed.load(Ordering::SeqCst), 0);

    let token = token_for(UserId::new_v4());
    let response = get(app, "/guarded", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(executed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: UserId::new_v4().to_string(),
        aud: Some("authenticated".into()),
        exp: now - 600,
        iat: now - 1200,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(common::TEST_SECRET.as_bytes()),
    )
    .unwrap();

    let backend = Arc::new(CountingBackend::new());
    let app = common::build_test_app(backend.clone());
    let response = get(app, "/api/v1/profile", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn session_cookie_is_accepted_as_credential() {
    let user = UserId::new_v4();
    let app = common::build_test_app(Arc::new(CountingBackend::new()));

    let request = Request::builder()
        .uri("/api/v1/profile")
        .header("cookie", format!("sb-access-token={}", token_for(user)))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], user.to_string());
}

// ---------------------------------------------------------------------------
// Test: unclassified failures become a generic 500
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unclassified_backend_error_is_not_leaked() {
    let app = common::build_test_app(Arc::new(FailingBackend {
        detail: "relation \"user_games\" is locked by pid 4242".into(),
    }));
    let token = token_for(UserId::new_v4());

    let response = get(app, "/api/v1/collection", Some(&token)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_text(response).await;
    assert!(text.contains(INTERNAL_ERROR_MESSAGE));
    assert!(!text.contains("pid 4242"));
    assert!(!text.contains("user_games"));
}

#[tokio::test]
async fn handler_panic_becomes_generic_500() {
    let routes: Router<AppState> = app_routes().route(
        "/boom",
        get_route(|| async {
            if true {
                panic!("secret panic detail");
            }
            "unreachable"
        }),
    );
    let app = common::build_test_app_with(routes, Arc::new(CountingBackend::new()), None);

    let response = get(app, "/boom", None).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], INTERNAL_ERROR_MESSAGE);
    assert!(!json.to_string().contains("secret panic detail"));
}
