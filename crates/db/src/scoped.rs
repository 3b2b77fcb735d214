//! Request-scoped data-access client.

use std::sync::Arc;

use memcard_core::session::SessionIdentity;
use memcard_core::types::UserId;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{DataBackend, Select};
use crate::error::DataError;

/// Data-access handle bound to one caller's credentials.
///
/// Built once per inbound request and dropped with it. Deliberately not
/// `Clone`: a scoped client must never outlive or escape its request.
pub struct ScopedClient {
    backend: Arc<dyn DataBackend>,
    caller: Option<SessionIdentity>,
}

impl ScopedClient {
    pub fn new(backend: Arc<dyn DataBackend>, caller: Option<SessionIdentity>) -> Self {
        Self { backend, caller }
    }

    pub fn caller(&self) -> Option<&SessionIdentity> {
        self.caller.as_ref()
    }

    /// The caller's user id, or [`DataError::Unauthenticated`].
    pub fn require_caller(&self) -> Result<UserId, DataError> {
        self.caller
            .as_ref()
            .map(|identity| identity.user_id)
            .ok_or(DataError::Unauthenticated)
    }

    /// Invoke a stored procedure and decode its JSON result into `T`.
    pub async fn rpc<T: DeserializeOwned>(
        &self,
        procedure: &str,
        args: Value,
    ) -> Result<T, DataError> {
        tracing::debug!(
            procedure,
            user_id = ?self.caller.as_ref().map(|c| c.user_id),
            "Invoking remote procedure"
        );
        let value = self
            .backend
            .rpc(self.caller.as_ref(), procedure, args)
            .await
            .inspect_err(|e| {
                if matches!(e, DataError::Remote(_)) {
                    tracing::error!(procedure, error = %e, "Remote procedure failed");
                }
            })?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run a passthrough select and decode every row into `T`.
    pub async fn select<T: DeserializeOwned>(&self, query: &Select) -> Result<Vec<T>, DataError> {
        let rows = self.backend.select(self.caller.as_ref(), query).await?;
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(DataError::from))
            .collect()
    }
}

impl std::fmt::Debug for ScopedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedClient")
            .field("user_id", &self.caller.as_ref().map(|c| c.user_id))
            .finish_non_exhaustive()
    }
}
