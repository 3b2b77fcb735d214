use std::sync::Arc;

/// Errors surfaced by the client SDK.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    ///
    /// `code` and `message` are filled from the `{ "error", "code" }` body
    /// when one is present; callers must not rely on either.
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Api {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    /// A response body did not match the expected schema.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An operation needed a signed-in session.
    #[error("Not signed in")]
    NotSignedIn,

    /// Persisted state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A running total left the representable range.
    #[error(transparent)]
    Money(#[from] memcard_core::money::MoneyOverflow),

    /// A cached value was read back as a different type than it was stored as.
    #[error("Cached value for {entity} has an unexpected type")]
    CacheType { entity: &'static str },

    /// A failure shared by every caller awaiting the same in-flight fetch.
    #[error(transparent)]
    Shared(Arc<ClientError>),
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Shared(inner) => inner.status(),
            _ => None,
        }
    }

    /// Whether the failure is a server-side (5xx) error. User-facing code
    /// should offer a generic retry rather than the raw message for these.
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| s >= 500)
    }
}
