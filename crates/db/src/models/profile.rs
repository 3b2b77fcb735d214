use memcard_core::rank::PlayerRank;
use memcard_core::types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A row from the `profiles` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub player_rank: Option<PlayerRank>,
    pub created_at: Timestamp,
}
