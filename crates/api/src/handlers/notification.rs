//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthContext`].

use axum::http::StatusCode;
use axum::Json;
use memcard_core::dto::{AchievementNotificationRequest, FriendNotificationRequest};
use memcard_core::types::DbId;
use memcard_db::models::notification::{CreatedNotification, Notification, WishlistValidation};
use memcard_db::repositories::NotificationRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::middleware::auth::AuthContext;
use crate::response::DataResponse;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize, Validate)]
pub struct NotificationQuery {
    /// If `true`, return only unread notifications. Defaults to `false`.
    pub unread_only: Option<bool>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Maximum page size for notification listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for notification listing.
const DEFAULT_LIMIT: i64 = 50;

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthContext,
    ValidQuery(params): ValidQuery<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    let unread_only = params.unread_only.unwrap_or(false);

    let notifications =
        NotificationRepo::list(&auth.client, unread_only, limit, offset).await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// POST /api/v1/notifications/{id}/validate
///
/// Marks a wishlist notification validated. A second call on the same id
/// is a 404, not a failure.
pub async fn validate_wishlist(
    auth: AuthContext,
    ValidPath(notification_id): ValidPath<DbId>,
) -> AppResult<Json<DataResponse<WishlistValidation>>> {
    let result = NotificationRepo::validate_wishlist(&auth.client, notification_id).await?;
    tracing::info!(
        user_id = %auth.user_id(),
        notification_id,
        remaining = result.remaining,
        "Wishlist notification validated"
    );
    Ok(Json(DataResponse { data: result }))
}

/// POST /api/v1/notifications/achievement
pub async fn create_achievement(
    auth: AuthContext,
    ValidJson(input): ValidJson<AchievementNotificationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedNotification>>)> {
    let created = NotificationRepo::create_achievement(&auth.client, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// POST /api/v1/notifications/friend
pub async fn create_friend(
    auth: AuthContext,
    ValidJson(input): ValidJson<FriendNotificationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedNotification>>)> {
    let created = NotificationRepo::create_friend(&auth.client, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}
