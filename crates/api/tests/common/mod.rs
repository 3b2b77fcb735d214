#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use memcard_api::auth::jwt::{generate_access_token, JwtConfig};
use memcard_api::auth::session::JwtSessionResolver;
use memcard_api::config::ServerConfig;
use memcard_api::router::{app_routes, with_middleware};
use memcard_api::state::AppState;
use memcard_catalog::{CatalogError, Game, GameCatalog};
use memcard_core::session::SessionIdentity;
use memcard_core::types::UserId;
use memcard_db::{DataBackend, DataError, MemoryBackend, Select};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: TEST_SECRET.to_string(),
        audience: Some("authenticated".to_string()),
        access_token_expiry_mins: 15,
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        auth_cookie_name: "sb-access-token".to_string(),
        jwt: test_jwt_config(),
    }
}

/// Mint a valid access token for `user_id`.
pub fn token_for(user_id: UserId) -> String {
    generate_access_token(user_id, &test_jwt_config()).unwrap()
}

pub fn test_state(backend: Arc<dyn DataBackend>, catalog: Option<Arc<dyn GameCatalog>>) -> AppState {
    let config = test_config();
    AppState {
        sessions: Arc::new(JwtSessionResolver::new(config.jwt.clone())),
        config: Arc::new(config),
        backend,
        catalog,
    }
}

/// Build the full application router over `backend`, with the same
/// middleware stack production uses.
pub fn build_test_app(backend: Arc<dyn DataBackend>) -> Router {
    build_test_app_with(app_routes(), backend, None)
}

pub fn build_test_app_with(
    routes: Router<AppState>,
    backend: Arc<dyn DataBackend>,
    catalog: Option<Arc<dyn GameCatalog>>,
) -> Router {
    let config = test_config();
    with_middleware(routes, test_state(backend, catalog), &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(app: Router, uri: &str, token: Option<&str>, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn delete(app: Router, uri: &str, token: Option<&str>) -> Response<Body> {
    send(app, Method::DELETE, uri, token, None).await
}

/// Collect a response body as raw text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert `status` and return the parsed body.
pub async fn expect_status(response: Response<Body>, status: StatusCode) -> Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// Wraps a [`MemoryBackend`] and counts every call that reaches it.
pub struct CountingBackend {
    pub inner: MemoryBackend,
    calls: AtomicUsize,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataBackend for CountingBackend {
    async fn rpc(
        &self,
        caller: Option<&SessionIdentity>,
        procedure: &str,
        args: Value,
    ) -> Result<Value, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.rpc(caller, procedure, args).await
    }

    async fn select(
        &self,
        caller: Option<&SessionIdentity>,
        query: &Select,
    ) -> Result<Vec<Value>, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.select(caller, query).await
    }

    async fn ping(&self) -> Result<(), DataError> {
        self.inner.ping().await
    }
}

/// Fails every call with an unclassified remote error carrying `detail`.
pub struct FailingBackend {
    pub detail: String,
}

#[async_trait]
impl DataBackend for FailingBackend {
    async fn rpc(
        &self,
        _caller: Option<&SessionIdentity>,
        _procedure: &str,
        _args: Value,
    ) -> Result<Value, DataError> {
        Err(DataError::Remote(self.detail.clone()))
    }

    async fn select(
        &self,
        _caller: Option<&SessionIdentity>,
        _query: &Select,
    ) -> Result<Vec<Value>, DataError> {
        Err(DataError::Remote(self.detail.clone()))
    }

    async fn ping(&self) -> Result<(), DataError> {
        Err(DataError::Remote(self.detail.clone()))
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Serves a fixed list of games.
pub struct StaticCatalog {
    pub games: Vec<Game>,
}

#[async_trait]
impl GameCatalog for StaticCatalog {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Game>, CatalogError> {
        let needle = query.to_lowercase();
        Ok(self
            .games
            .iter()
            .filter(|g| g.name.to_lowercase().contains(&needle))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn game(&self, id: i64) -> Result<Option<Game>, CatalogError> {
        Ok(self.games.iter().find(|g| g.id == id).cloned())
    }
}

pub fn game(id: i64, name: &str) -> Game {
    Game {
        id,
        name: name.to_string(),
        summary: None,
        first_release_date: None,
        cover: None,
        platforms: Vec::new(),
    }
}
