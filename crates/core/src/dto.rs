//! Request payloads accepted by the HTTP surface.
//!
//! Required fields are modelled as `Option` so a missing field is reported
//! as a 400 validation failure by [`validator::Validate`] instead of a body
//! deserialization rejection. Validation always runs before any call to the
//! data service.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::rank::MAX_ANSWER_WEIGHT;
use crate::types::UserId;

/// How the user holds a catalogued game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    Owned,
    Wishlist,
    Sold,
}

/// Physical condition of an owned copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Sealed,
    Complete,
    Loose,
    Damaged,
}

/// Body of `POST /collection`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AddGameRequest {
    #[validate(required, range(min = 1))]
    pub igdb_game_id: Option<i64>,
    #[validate(length(min = 1, max = 64))]
    pub platform: Option<String>,
    pub ownership: Option<Ownership>,
    #[validate(range(min = 0.0))]
    pub purchase_price: Option<f64>,
    pub purchase_date: Option<NaiveDate>,
    pub condition: Option<Condition>,
}

/// Body of `PUT /profile`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Body of `POST /notifications/achievement`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AchievementNotificationRequest {
    #[validate(required)]
    pub user_id: Option<UserId>,
    #[validate(required, length(min = 1, max = 200))]
    pub achievement: Option<String>,
}

/// Body of `POST /notifications/friend`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FriendNotificationRequest {
    #[validate(required)]
    pub friend_id: Option<UserId>,
}

/// Body of `POST /quiz`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct QuizSubmission {
    #[validate(length(min = 1, max = 50), custom(function = "validate_answers"))]
    #[serde(default)]
    pub answers: Vec<u8>,
}

/// Query string of `GET /games/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GameSearchQuery {
    #[validate(required, length(min = 1, max = 100))]
    pub q: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<u32>,
}

fn validate_answers(answers: &[u8]) -> Result<(), ValidationError> {
    if answers.iter().any(|&weight| weight > MAX_ANSWER_WEIGHT) {
        return Err(ValidationError::new("answer_weight_out_of_range"));
    }
    Ok(())
}
