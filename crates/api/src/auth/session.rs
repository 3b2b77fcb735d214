//! Resolution of bearer credentials into a [`SessionIdentity`].

use async_trait::async_trait;
use memcard_core::session::SessionIdentity;

use crate::auth::jwt::{validate_token, JwtConfig};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid or expired token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Token subject is not a user id")]
    InvalidSubject,
}

/// Exchanges a bearer credential for the caller's identity.
///
/// Implementations wrap the identity provider; the gateway never inspects
/// tokens itself.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<SessionIdentity, SessionError>;
}

/// Resolves sessions by verifying the provider's HS256-signed JWTs locally.
pub struct JwtSessionResolver {
    config: JwtConfig,
}

impl JwtSessionResolver {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve(&self, token: &str) -> Result<SessionIdentity, SessionError> {
        let claims = validate_token(token, &self.config)?;
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| SessionError::InvalidSubject)?;
        let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0)
            .ok_or(SessionError::InvalidSubject)?;
        Ok(SessionIdentity::new(user_id, token, expires_at))
    }
}
