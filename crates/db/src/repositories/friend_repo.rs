//! Friend relationship reads and procedures.

use memcard_core::types::UserId;
use serde_json::json;

use crate::backend::Select;
use crate::error::DataError;
use crate::models::friendship::{Friendship, RemovedFriend};
use crate::scoped::ScopedClient;

pub struct FriendRepo;

impl FriendRepo {
    /// Every relationship the caller is a party to. Visibility is enforced
    /// by row-level policy, not filtered here.
    pub async fn list(client: &ScopedClient) -> Result<Vec<Friendship>, DataError> {
        client.require_caller()?;
        client
            .select(&Select::from("friendships").order_by("created_at", false))
            .await
    }

    /// Send a pending friend request to `friend_id`.
    pub async fn request(client: &ScopedClient, friend_id: UserId) -> Result<Friendship, DataError> {
        let user_id = client.require_caller()?;
        if user_id == friend_id {
            return Err(DataError::Invalid("cannot befriend yourself".into()));
        }
        client
            .rpc("request_friend", json!({ "friend_id": friend_id }))
            .await
    }

    /// Accept a pending request that `friend_id` sent to the caller.
    pub async fn accept(client: &ScopedClient, friend_id: UserId) -> Result<Friendship, DataError> {
        client.require_caller()?;
        client
            .rpc("accept_friend", json!({ "friend_id": friend_id }))
            .await
    }

    /// Remove the relationship with `friend_id` whichever side created it.
    ///
    /// Idempotent: removing an absent relationship succeeds with
    /// `removed == 0`.
    pub async fn remove(
        client: &ScopedClient,
        friend_id: UserId,
    ) -> Result<RemovedFriend, DataError> {
        client.require_caller()?;
        client
            .rpc("remove_friend", json!({ "friend_id": friend_id }))
            .await
    }
}
