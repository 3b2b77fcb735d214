//! Player-rank scoring for the onboarding quiz.
//!
//! Each answer carries a weight from `0` (casual choice) to
//! [`MAX_ANSWER_WEIGHT`] (most dedicated choice). The rank is picked from
//! the average weight expressed as a percentage of the maximum.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const MAX_ANSWER_WEIGHT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRank {
    Casual,
    Enthusiast,
    Collector,
    Hardcore,
    Legend,
}

impl PlayerRank {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerRank::Casual => "casual",
            PlayerRank::Enthusiast => "enthusiast",
            PlayerRank::Collector => "collector",
            PlayerRank::Hardcore => "hardcore",
            PlayerRank::Legend => "legend",
        }
    }
}

impl std::fmt::Display for PlayerRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score a completed quiz.
pub fn score(answers: &[u8]) -> Result<PlayerRank, CoreError> {
    if answers.is_empty() {
        return Err(CoreError::Validation("quiz has no answers".into()));
    }
    if answers.iter().any(|&w| w > MAX_ANSWER_WEIGHT) {
        return Err(CoreError::Validation(format!(
            "answer weights must be between 0 and {MAX_ANSWER_WEIGHT}"
        )));
    }

    let total: u32 = answers.iter().map(|&w| u32::from(w)).sum();
    let max = answers.len() as u32 * u32::from(MAX_ANSWER_WEIGHT);
    let percent = total * 100 / max;

    Ok(match percent {
        0..=19 => PlayerRank::Casual,
        20..=39 => PlayerRank::Enthusiast,
        40..=59 => PlayerRank::Collector,
        60..=79 => PlayerRank::Hardcore,
        _ => PlayerRank::Legend,
    })
}
