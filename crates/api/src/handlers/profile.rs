//! Handlers for the `/profile` resource.

use axum::Json;
use memcard_core::dto::UpdateProfileRequest;
use memcard_db::models::profile::Profile;
use memcard_db::repositories::ProfileRepo;

use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::middleware::auth::AuthContext;
use crate::response::DataResponse;

/// GET /api/v1/profile
pub async fn get_profile(auth: AuthContext) -> AppResult<Json<DataResponse<Profile>>> {
    let profile = ProfileRepo::current(&auth.client).await?;
    Ok(Json(DataResponse { data: profile }))
}

/// PUT /api/v1/profile
pub async fn update_profile(
    auth: AuthContext,
    ValidJson(input): ValidJson<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<Profile>>> {
    let profile = ProfileRepo::update(&auth.client, &input).await?;
    tracing::info!(user_id = %auth.user_id(), "Profile updated");
    Ok(Json(DataResponse { data: profile }))
}
