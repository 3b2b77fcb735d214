use memcard_core::types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

/// A row from the `friendships` table. `user_id` is the requesting party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friendship {
    pub user_id: UserId,
    pub friend_id: UserId,
    pub status: FriendshipStatus,
    pub created_at: Timestamp,
}

impl Friendship {
    /// Whether the pair matches `(a, b)` in either direction.
    pub fn connects(&self, a: UserId, b: UserId) -> bool {
        (self.user_id == a && self.friend_id == b) || (self.user_id == b && self.friend_id == a)
    }
}

/// Result of `remove_friend`. `removed` is 0 when nothing was left to delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedFriend {
    pub success: bool,
    pub removed: i64,
}

/// Result of `delete_account`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedAccount {
    pub success: bool,
    pub deleted_rows: i64,
}
