//! Handler for `/quiz`.

use axum::Json;
use memcard_core::dto::QuizSubmission;
use memcard_core::rank::{self, PlayerRank};
use memcard_db::models::profile::Profile;
use memcard_db::repositories::ProfileRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::middleware::auth::AuthContext;
use crate::response::DataResponse;

#[derive(Debug, Serialize)]
pub struct QuizResult {
    pub rank: PlayerRank,
    pub profile: Profile,
}

/// POST /api/v1/quiz
///
/// Scores the answers and stores the resulting rank on the caller's profile.
pub async fn submit_quiz(
    auth: AuthContext,
    ValidJson(submission): ValidJson<QuizSubmission>,
) -> AppResult<Json<DataResponse<QuizResult>>> {
    let rank = rank::score(&submission.answers)?;
    let profile = ProfileRepo::set_player_rank(&auth.client, rank).await?;
    tracing::info!(user_id = %auth.user_id(), %rank, "Player rank assigned");
    Ok(Json(DataResponse {
        data: QuizResult { rank, profile },
    }))
}
