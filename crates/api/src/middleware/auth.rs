//! Request authorization pipeline.
//!
//! Every request handled by the API passes through the same stages:
//!
//! 1. [`extract_credential`] -- bearer header, else the session cookie.
//! 2. [`resolve_session`] -- credential to [`SessionIdentity`]; failures
//!    leave the caller anonymous.
//! 3. [`build_client`] -- a [`ScopedClient`] bound to that identity.
//! 4. [`require_auth`] -- rejects anonymous callers with 401.
//!
//! Handlers opt in by taking [`ApiContext`] (anonymous allowed) or
//! [`AuthContext`] (authentication required) as an extractor. Rejection in
//! stage 4 happens during extraction, so the handler body never runs.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use memcard_core::error::CoreError;
use memcard_core::session::SessionIdentity;
use memcard_core::types::UserId;
use memcard_db::{DataBackend, ScopedClient};

use crate::auth::session::SessionResolver;
use crate::error::AppError;
use crate::state::AppState;

/// Pull the raw bearer credential from the request.
///
/// The `Authorization: Bearer <token>` header wins; otherwise the cookie
/// named `cookie_name` is used. Empty values count as absent.
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve a credential into an identity. Invalid credentials yield `None`.
pub async fn resolve_session(
    resolver: &dyn SessionResolver,
    credential: Option<&str>,
) -> Option<SessionIdentity> {
    let token = credential?;
    match resolver.resolve(token).await {
        Ok(identity) => Some(identity),
        Err(e) => {
            tracing::debug!(error = %e, "Bearer credential rejected");
            None
        }
    }
}

pub fn build_client(backend: Arc<dyn DataBackend>, user: Option<SessionIdentity>) -> ScopedClient {
    ScopedClient::new(backend, user)
}

/// Promote an [`ApiContext`] to an [`AuthContext`], or reject with 401.
pub fn require_auth(context: ApiContext) -> Result<AuthContext, AppError> {
    match context.user {
        Some(user) => Ok(AuthContext {
            user,
            client: context.client,
        }),
        None => Err(AppError::Core(CoreError::Unauthorized(
            "Authentication required".into(),
        ))),
    }
}

/// Per-request context for endpoints that allow anonymous callers.
#[derive(Debug)]
pub struct ApiContext {
    pub user: Option<SessionIdentity>,
    pub client: ScopedClient,
}

impl FromRequestParts<AppState> for ApiContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = extract_credential(&parts.headers, &state.config.auth_cookie_name);
        let user = resolve_session(state.sessions.as_ref(), credential.as_deref()).await;
        let client = build_client(Arc::clone(&state.backend), user.clone());
        Ok(ApiContext { user, client })
    }
}

/// Per-request context for endpoints that require authentication.
///
/// ```ignore
/// async fn my_handler(auth: AuthContext) -> AppResult<Json<DataResponse<Profile>>> {
///     let profile = ProfileRepo::current(&auth.client).await?;
///     Ok(Json(DataResponse { data: profile }))
/// }
/// ```
#[derive(Debug)]
pub struct AuthContext {
    pub user: SessionIdentity,
    pub client: ScopedClient,
}

impl AuthContext {
    pub fn user_id(&self) -> UserId {
        self.user.user_id
    }
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let context = ApiContext::from_request_parts(parts, state).await?;
        require_auth(context)
    }
}
