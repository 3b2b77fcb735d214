//! The caller's profile.

use memcard_core::dto::UpdateProfileRequest;
use memcard_core::rank::PlayerRank;
use serde_json::json;
use validator::Validate;

use crate::error::DataError;
use crate::models::profile::Profile;
use crate::scoped::ScopedClient;

pub struct ProfileRepo;

impl ProfileRepo {
    /// Fetch the caller's profile, creating an empty one on first access.
    pub async fn current(client: &ScopedClient) -> Result<Profile, DataError> {
        client.require_caller()?;
        client.rpc("current_profile", json!({})).await
    }

    pub async fn update(
        client: &ScopedClient,
        input: &UpdateProfileRequest,
    ) -> Result<Profile, DataError> {
        input.validate()?;
        client.require_caller()?;
        client.rpc("update_profile", serde_json::to_value(input)?).await
    }

    pub async fn set_player_rank(
        client: &ScopedClient,
        rank: PlayerRank,
    ) -> Result<Profile, DataError> {
        client.require_caller()?;
        client
            .rpc("set_player_rank", json!({ "rank": rank.as_str() }))
            .await
    }
}
