use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::chat::{ChatId, UserId};

pub const MAX_ROUNDS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct QuizQuestion {
    #[validate(length(min = 1, max = 100))]
    pub answer: String,
    #[validate(length(min = 1, max = 30))]
    pub category: String,
}

impl QuizQuestion {
    pub fn new(answer: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct StartQuizRequest {
    #[validate(range(min = 1, max = MAX_ROUNDS))]
    pub rounds: u32,
    #[validate(length(min = 1, max = 30))]
    pub category: Option<String>,
}

/// Points per category. Categories that were never scored read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable(BTreeMap<String, i64>);

impl ScoreTable {
    pub fn get(&self, category: &str) -> i64 {
        self.0.get(category).copied().unwrap_or(0)
    }

    /// Returns the new points for the category.
    pub fn increment(&mut self, category: &str) -> i64 {
        let points = self.0.entry(category.to_string()).or_insert(0);
        *points += 1;
        *points
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &i64)> {
        self.0.iter()
    }
}

impl<const N: usize> From<[(&str, i64); N]> for ScoreTable {
    fn from(entries: [(&str, i64); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(category, points)| (category.to_string(), points))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScoreRecord {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub display_name: String,
    pub scores: ScoreTable,
}

impl PlayerScoreRecord {
    pub fn new(user_id: UserId, chat_id: ChatId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            chat_id,
            display_name: display_name.into(),
            scores: ScoreTable::default(),
        }
    }
}
