//! Handlers for the `/collection` resource.
//!
//! All endpoints require authentication via [`AuthContext`]; the scoped
//! client limits every read and write to the caller's own games.

use axum::http::StatusCode;
use axum::Json;
use memcard_core::dto::AddGameRequest;
use memcard_core::types::DbId;
use memcard_db::models::collection::{CollectionTotal, PriceRecord, RemovedGame, UserGame};
use memcard_db::repositories::CollectionRepo;

use crate::error::AppResult;
use crate::extract::{ValidJson, ValidPath};
use crate::middleware::auth::AuthContext;
use crate::response::DataResponse;

/// GET /api/v1/collection
pub async fn list_games(auth: AuthContext) -> AppResult<Json<DataResponse<Vec<UserGame>>>> {
    let games = CollectionRepo::list(&auth.client).await?;
    Ok(Json(DataResponse { data: games }))
}

/// POST /api/v1/collection
///
/// Returns 201 with the stored row.
pub async fn add_game(
    auth: AuthContext,
    ValidJson(input): ValidJson<AddGameRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserGame>>)> {
    let game = CollectionRepo::add(&auth.client, &input).await?;
    tracing::info!(
        user_id = %auth.user_id(),
        game_id = game.id,
        igdb_game_id = game.igdb_game_id,
        "Game added to collection"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: game })))
}

/// DELETE /api/v1/collection/{id}
///
/// 404 if the row does not exist or belongs to someone else.
pub async fn remove_game(
    auth: AuthContext,
    ValidPath(id): ValidPath<DbId>,
) -> AppResult<Json<DataResponse<RemovedGame>>> {
    let removed = CollectionRepo::remove(&auth.client, id).await?;
    tracing::info!(user_id = %auth.user_id(), game_id = id, "Game removed from collection");
    Ok(Json(DataResponse { data: removed }))
}

/// GET /api/v1/collection/total
pub async fn collection_total(
    auth: AuthContext,
) -> AppResult<Json<DataResponse<CollectionTotal>>> {
    let total = CollectionRepo::total(&auth.client).await?;
    Ok(Json(DataResponse { data: total }))
}

/// GET /api/v1/collection/prices
///
/// Per-item purchase prices; clients recompute their running total from these.
pub async fn price_records(
    auth: AuthContext,
) -> AppResult<Json<DataResponse<Vec<PriceRecord>>>> {
    let records = CollectionRepo::price_records(&auth.client).await?;
    Ok(Json(DataResponse { data: records }))
}
