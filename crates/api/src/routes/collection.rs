//! Route definitions for the `/collection` resource.
//!
//! All endpoints require authentication.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::collection;
use crate::state::AppState;

/// Routes mounted at `/collection`.
///
/// ```text
/// GET    /          -> list_games
/// POST   /          -> add_game
/// GET    /total     -> collection_total
/// GET    /prices    -> price_records
/// DELETE /{id}      -> remove_game
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(collection::list_games).post(collection::add_game))
        .route("/total", get(collection::collection_total))
        .route("/prices", get(collection::price_records))
        .route("/{id}", delete(collection::remove_game))
}
