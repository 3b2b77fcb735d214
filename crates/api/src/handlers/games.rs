//! Handlers for the `/games` catalog endpoints.
//!
//! Authentication is optional; the caller id is only used for logging.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use memcard_catalog::{Game, GameCatalog};
use memcard_core::dto::GameSearchQuery;
use memcard_core::error::{require, CoreError};

use crate::error::{AppError, AppResult};
use crate::extract::{ValidPath, ValidQuery};
use crate::middleware::auth::ApiContext;
use crate::response::DataResponse;
use crate::state::AppState;

/// Results returned when `limit` is omitted.
const DEFAULT_SEARCH_LIMIT: u32 = 20;

fn catalog(state: &AppState) -> AppResult<&Arc<dyn GameCatalog>> {
    state
        .catalog
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Game catalog is not configured".into()))
}

/// GET /api/v1/games/search?q=&limit=
pub async fn search_games(
    ctx: ApiContext,
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<GameSearchQuery>,
) -> AppResult<Json<DataResponse<Vec<Game>>>> {
    let query = require(params.q.as_deref(), "q")?;
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let games = catalog(&state)?.search(query, limit).await?;
    tracing::debug!(
        user_id = ?ctx.user.as_ref().map(|u| u.user_id),
        query,
        results = games.len(),
        "Catalog search"
    );
    Ok(Json(DataResponse { data: games }))
}

/// GET /api/v1/games/{id}
pub async fn get_game(
    _ctx: ApiContext,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<DataResponse<Game>>> {
    let game = catalog(&state)?
        .game(id)
        .await?
        .ok_or_else(|| CoreError::not_found("Game", id))?;
    Ok(Json(DataResponse { data: game }))
}
