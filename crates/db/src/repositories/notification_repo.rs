//! Notification reads and procedures.

use memcard_core::dto::{AchievementNotificationRequest, FriendNotificationRequest};
use memcard_core::error::require;
use memcard_core::types::DbId;
use serde_json::json;
use validator::Validate;

use crate::backend::Select;
use crate::error::DataError;
use crate::models::notification::{CreatedNotification, Notification, WishlistValidation};
use crate::scoped::ScopedClient;

pub struct NotificationRepo;

impl NotificationRepo {
    /// List the caller's notifications, newest first.
    pub async fn list(
        client: &ScopedClient,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, DataError> {
        let user_id = client.require_caller()?;
        let mut query = Select::from("notifications").eq("user_id", user_id);
        if unread_only {
            query = query.eq("is_read", false);
        }
        client
            .select(
                &query
                    .order_by("created_at", false)
                    .limit(limit)
                    .offset(offset),
            )
            .await
    }

    /// Mark a wishlist notification validated and count the ones left.
    ///
    /// A second validation of the same notification is reported as
    /// [`DataError::NotFound`], never as a remote failure.
    pub async fn validate_wishlist(
        client: &ScopedClient,
        notification_id: DbId,
    ) -> Result<WishlistValidation, DataError> {
        client.require_caller()?;
        client
            .rpc(
                "validate_wishlist_notification",
                json!({ "notification_id": notification_id }),
            )
            .await
    }

    /// Notify `input.user_id` of an achievement.
    pub async fn create_achievement(
        client: &ScopedClient,
        input: &AchievementNotificationRequest,
    ) -> Result<CreatedNotification, DataError> {
        input.validate()?;
        client.require_caller()?;
        let user_id = require(input.user_id, "user_id")?;
        let achievement = require(input.achievement.as_deref(), "achievement")?;
        client
            .rpc(
                "create_achievement_notification",
                json!({ "user_id": user_id, "achievement": achievement }),
            )
            .await
    }

    /// Notify `input.friend_id` that the caller added them.
    pub async fn create_friend(
        client: &ScopedClient,
        input: &FriendNotificationRequest,
    ) -> Result<CreatedNotification, DataError> {
        input.validate()?;
        client.require_caller()?;
        let friend_id = require(input.friend_id, "friend_id")?;
        client
            .rpc(
                "create_friend_notification",
                json!({ "friend_id": friend_id }),
            )
            .await
    }
}
