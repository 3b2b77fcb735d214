use chrono::NaiveDate;
use memcard_core::dto::{Condition, Ownership};
use memcard_core::money::Money;
use memcard_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A row from the `user_games` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserGame {
    pub id: DbId,
    pub user_id: UserId,
    pub igdb_game_id: i64,
    pub platform: Option<String>,
    pub ownership: Ownership,
    pub purchase_price: Option<f64>,
    pub purchase_date: Option<NaiveDate>,
    pub condition: Option<Condition>,
    pub created_at: Timestamp,
}

/// One owned item's purchase price, as returned by `collection_price_records`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub id: DbId,
    pub purchase_price: Option<f64>,
}

impl PriceRecord {
    /// Price in cents; items without a recorded price count as zero.
    pub fn price(&self) -> Money {
        self.purchase_price.map(Money::from_major).unwrap_or_default()
    }
}

/// Server-side aggregate returned by `collection_total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionTotal {
    pub total: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedGame {
    pub success: bool,
}
