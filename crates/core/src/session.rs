//! The authenticated caller's identity.

use serde::{Deserialize, Serialize};

use crate::types::{Timestamp, UserId};

/// Identity resolved from a bearer credential.
///
/// Owned by the identity provider; the server reads it to authorize a
/// request and the client reads it to scope cached data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user_id: UserId,
    /// Raw bearer token, forwarded to the data service as the caller's claims.
    #[serde(skip_serializing)]
    pub access_token: String,
    pub expires_at: Timestamp,
}

impl SessionIdentity {
    pub fn new(user_id: UserId, access_token: impl Into<String>, expires_at: Timestamp) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Whether the credential is past its expiry at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Two identities refer to the same user, regardless of token rotation.
    pub fn same_user(&self, other: &SessionIdentity) -> bool {
        self.user_id == other.user_id
    }
}
