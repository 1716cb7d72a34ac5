use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    models::{
        chat::{ChatId, UserId},
        error::QuizError,
        quiz::PlayerScoreRecord,
    },
    service::repository::{QuizRepository, RepositoryError},
};

/// Minimum total score for each title, ascending.
pub const TITLES: [(i64, &str); 7] = [
    (0, "뉴비"),
    (30, "평범한"),
    (100, "준수한"),
    (300, "탁월한"),
    (500, "월등한"),
    (1000, "초월한"),
    (2000, "해탈한"),
];

type PlayerKey = (UserId, ChatId);

pub struct ScoreBook {
    repo: Arc<dyn QuizRepository>,
    records: Cache<PlayerKey, PlayerScoreRecord>,
    locks: DashMap<PlayerKey, Arc<Mutex<()>>>,
}

impl ScoreBook {
    pub fn new(repo: Arc<dyn QuizRepository>) -> Self {
        let records = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(60 * 60))
            .build();

        Self {
            repo,
            records,
            locks: DashMap::new(),
        }
    }

    /// Adds one point in `category` for the player, creating the record on
    /// the first win in the room. Wins of the same player in the same room
    /// are applied one at a time.
    pub async fn record_win(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        display_name: &str,
        category: &str,
    ) -> Result<PlayerScoreRecord, RepositoryError> {
        let key = (user_id, chat_id);
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.apply_win(key, display_name, category).await
        };

        // Only the map holds the lock once nobody waits on it
        drop(lock);
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    #[cfg(test)]
    pub fn pending_locks(&self) -> usize {
        self.locks.len()
    }

    async fn apply_win(
        &self,
        key: PlayerKey,
        display_name: &str,
        category: &str,
    ) -> Result<PlayerScoreRecord, RepositoryError> {
        let (user_id, chat_id) = key;
        let mut record = match self.load(key).await? {
            Some(record) => record,
            None => PlayerScoreRecord::new(user_id, chat_id, display_name),
        };
        record.display_name = display_name.to_string();
        let points = record.scores.increment(category);

        self.repo.upsert_player_record(&record).await?;
        self.records.insert(key, record.clone()).await;

        debug!(
            "Recorded win for user {} in chat {}: {} = {}",
            user_id, chat_id, category, points
        );
        Ok(record)
    }

    async fn load(&self, key: PlayerKey) -> Result<Option<PlayerScoreRecord>, RepositoryError> {
        if let Some(record) = self.records.get(&key).await {
            return Ok(Some(record));
        }

        let record = self.repo.find_player_record(key.0, key.1).await?;
        if let Some(record) = &record {
            self.records.insert(key, record.clone()).await;
        }

        Ok(record)
    }

    pub async fn player_score(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<PlayerScoreRecord, QuizError> {
        self.load((user_id, chat_id)).await?.ok_or_else(|| {
            QuizError::NotFound(format!("score of user {} in chat {}", user_id, chat_id))
        })
    }

    /// Zero for players without a record.
    pub async fn total_for(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<i64, RepositoryError> {
        let record = self.load((user_id, chat_id)).await?;
        Ok(record.as_ref().map_or(0, Self::total_score))
    }

    pub fn total_score(record: &PlayerScoreRecord) -> i64 {
        record.scores.total()
    }

    /// Title of the highest threshold the total has reached.
    pub fn title(total: i64) -> &'static str {
        let mut title = TITLES[0].1;
        for (threshold, name) in TITLES {
            if total >= threshold {
                title = name;
            }
        }
        title
    }

    /// Every player of the room with their total, best first. Ties keep the
    /// repository's order.
    pub async fn ranking_for_room(
        &self,
        chat_id: ChatId,
    ) -> Result<Vec<(String, i64)>, RepositoryError> {
        let mut ranking: Vec<(String, i64)> = self
            .repo
            .find_players_in_room(chat_id)
            .await?
            .into_iter()
            .map(|record| {
                let total = Self::total_score(&record);
                (record.display_name, total)
            })
            .collect();

        ranking.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(ranking)
    }
}
