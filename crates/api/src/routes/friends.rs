//! Route definitions for the `/friends` resource.
//!
//! All endpoints require authentication.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::friends;
use crate::state::AppState;

/// Routes mounted at `/friends`.
///
/// ```text
/// GET    /                      -> list_friends
/// DELETE /{friend_id}           -> remove_friend
/// POST   /{friend_id}/request   -> request_friend
/// POST   /{friend_id}/accept    -> accept_friend
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(friends::list_friends))
        .route("/{friend_id}", delete(friends::remove_friend))
        .route("/{friend_id}/request", post(friends::request_friend))
        .route("/{friend_id}/accept", post(friends::accept_friend))
}
