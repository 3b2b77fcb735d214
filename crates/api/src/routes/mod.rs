pub mod account;
pub mod collection;
pub mod friends;
pub mod games;
pub mod health;
pub mod notification;
pub mod profile;
pub mod quiz;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /profile                                         get, update (auth)
///
/// /collection                                      list, add (auth)
/// /collection/total                                server-side price total (auth)
/// /collection/prices                               per-item price records (auth)
/// /collection/{id}                                 remove (auth)
///
/// /friends                                         list (auth)
/// /friends/{friend_id}                             remove, either direction (auth)
/// /friends/{friend_id}/request                     send request (auth)
/// /friends/{friend_id}/accept                      accept request (auth)
///
/// /notifications                                   list (auth)
/// /notifications/achievement                       create achievement notification (auth)
/// /notifications/friend                            create friend notification (auth)
/// /notifications/{id}/validate                     validate wishlist notification (auth)
///
/// /account                                         delete (auth)
/// /quiz                                            submit answers (auth)
///
/// /games/search                                    catalog search (optional auth)
/// /games/{id}                                      catalog lookup (optional auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/profile", profile::router())
        .nest("/collection", collection::router())
        .nest("/friends", friends::router())
        .nest("/notifications", notification::router())
        .nest("/account", account::router())
        .nest("/quiz", quiz::router())
        .nest("/games", games::router())
}
