//! Route definitions for the `/games` catalog endpoints.
//!
//! Authentication is optional.

use axum::routing::get;
use axum::Router;

use crate::handlers::games;
use crate::state::AppState;

/// Routes mounted at `/games`.
///
/// ```text
/// GET    /search?q=&limit=   -> search_games
/// GET    /{id}               -> get_game
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(games::search_games))
        .route("/{id}", get(games::get_game))
}
