//! Account lifecycle procedures.

use serde_json::json;

use crate::error::DataError;
use crate::models::friendship::DeletedAccount;
use crate::scoped::ScopedClient;

pub struct AccountRepo;

impl AccountRepo {
    /// Delete the caller's account and every row it owns in one procedure
    /// call.
    pub async fn delete(client: &ScopedClient) -> Result<DeletedAccount, DataError> {
        let user_id = client.require_caller()?;
        let result: DeletedAccount = client.rpc("delete_account", json!({})).await?;
        tracing::info!(%user_id, deleted_rows = result.deleted_rows, "Account deleted");
        Ok(result)
    }
}
