//! Notification entity models and procedure results.

use memcard_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Wishlist,
    Achievement,
    Friend,
}

/// A row from the `notifications` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub validated_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Result of `validate_wishlist_notification`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistValidation {
    pub success: bool,
    /// Wishlist notifications still awaiting validation.
    pub remaining: i64,
}

/// Result of the `create_*_notification` procedures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedNotification {
    pub id: DbId,
}
