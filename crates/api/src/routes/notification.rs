//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                 -> list_notifications
/// POST   /achievement      -> create_achievement
/// POST   /friend           -> create_friend
/// POST   /{id}/validate    -> validate_wishlist
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list_notifications))
        .route("/achievement", post(notification::create_achievement))
        .route("/friend", post(notification::create_friend))
        .route("/{id}/validate", post(notification::validate_wishlist))
}
