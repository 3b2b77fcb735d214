//! Handlers for the `/friends` resource.

use axum::http::StatusCode;
use axum::Json;
use memcard_core::types::UserId;
use memcard_db::models::friendship::{Friendship, RemovedFriend};
use memcard_db::repositories::FriendRepo;

use crate::error::AppResult;
use crate::extract::ValidPath;
use crate::middleware::auth::AuthContext;
use crate::response::DataResponse;

/// GET /api/v1/friends
///
/// Relationships in either direction, pending and accepted.
pub async fn list_friends(auth: AuthContext) -> AppResult<Json<DataResponse<Vec<Friendship>>>> {
    let friends = FriendRepo::list(&auth.client).await?;
    Ok(Json(DataResponse { data: friends }))
}

/// POST /api/v1/friends/{friend_id}/request
pub async fn request_friend(
    auth: AuthContext,
    ValidPath(friend_id): ValidPath<UserId>,
) -> AppResult<(StatusCode, Json<DataResponse<Friendship>>)> {
    let friendship = FriendRepo::request(&auth.client, friend_id).await?;
    tracing::info!(user_id = %auth.user_id(), %friend_id, "Friend request sent");
    Ok((StatusCode::CREATED, Json(DataResponse { data: friendship })))
}

/// POST /api/v1/friends/{friend_id}/accept
pub async fn accept_friend(
    auth: AuthContext,
    ValidPath(friend_id): ValidPath<UserId>,
) -> AppResult<Json<DataResponse<Friendship>>> {
    let friendship = FriendRepo::accept(&auth.client, friend_id).await?;
    tracing::info!(user_id = %auth.user_id(), %friend_id, "Friend request accepted");
    Ok(Json(DataResponse { data: friendship }))
}

/// DELETE /api/v1/friends/{friend_id}
///
/// Removes the relationship whichever side created it. Removing an absent
/// relationship succeeds with `removed: 0`.
pub async fn remove_friend(
    auth: AuthContext,
    ValidPath(friend_id): ValidPath<UserId>,
) -> AppResult<Json<DataResponse<RemovedFriend>>> {
    let removed = FriendRepo::remove(&auth.client, friend_id).await?;
    tracing::info!(
        user_id = %auth.user_id(),
        %friend_id,
        removed = removed.removed,
        "Friendship removed"
    );
    Ok(Json(DataResponse { data: removed }))
}
