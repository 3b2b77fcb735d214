//! The caller's game collection.

use memcard_core::dto::AddGameRequest;
use memcard_core::types::DbId;
use validator::Validate;

use crate::backend::Select;
use crate::error::DataError;
use crate::models::collection::{CollectionTotal, PriceRecord, RemovedGame, UserGame};
use crate::scoped::ScopedClient;

pub struct CollectionRepo;

impl CollectionRepo {
    /// List the caller's games, newest first.
    pub async fn list(client: &ScopedClient) -> Result<Vec<UserGame>, DataError> {
        let user_id = client.require_caller()?;
        client
            .select(
                &Select::from("user_games")
                    .eq("user_id", user_id)
                    .order_by("created_at", false),
            )
            .await
    }

    pub async fn add(client: &ScopedClient, input: &AddGameRequest) -> Result<UserGame, DataError> {
        input.validate()?;
        client.require_caller()?;
        client.rpc("add_game", serde_json::to_value(input)?).await
    }

    pub async fn remove(client: &ScopedClient, id: DbId) -> Result<RemovedGame, DataError> {
        client.require_caller()?;
        client.rpc("remove_game", serde_json::json!({ "id": id })).await
    }

    /// Per-item purchase prices of owned games, the source of truth for
    /// client-side totals.
    pub async fn price_records(client: &ScopedClient) -> Result<Vec<PriceRecord>, DataError> {
        client.require_caller()?;
        client
            .rpc("collection_price_records", serde_json::json!({}))
            .await
    }

    pub async fn total(client: &ScopedClient) -> Result<CollectionTotal, DataError> {
        client.require_caller()?;
        client.rpc("collection_total", serde_json::json!({})).await
    }
}
