use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    db::{health, quiz_player, quiz_question},
    models::{
        chat::{ChatId, UserId},
        quiz::{PlayerScoreRecord, QuizQuestion},
    },
};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage of the question bank and of the players' cumulative scores.
///
/// `category` is an optional filter; `None` matches every question.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn count_matching(&self, category: Option<&str>) -> Result<i64, RepositoryError>;

    async fn find_one_at_offset(
        &self,
        category: Option<&str>,
        offset: i64,
    ) -> Result<Option<QuizQuestion>, RepositoryError>;

    async fn find_player_record(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<Option<PlayerScoreRecord>, RepositoryError>;

    async fn upsert_player_record(&self, record: &PlayerScoreRecord)
    -> Result<(), RepositoryError>;

    async fn find_players_in_room(
        &self,
        chat_id: ChatId,
    ) -> Result<Vec<PlayerScoreRecord>, RepositoryError>;

    /// Returns false when the exact (answer, category) pair already exists.
    async fn create_question(&self, question: &QuizQuestion) -> Result<bool, RepositoryError>;

    /// Returns false when no stored question matches the exact pair.
    async fn delete_question(&self, question: &QuizQuestion) -> Result<bool, RepositoryError>;

    async fn health_check(&self) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct PgQuizRepository {
    pool: Pool<Postgres>,
}

impl PgQuizRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn count_matching(&self, category: Option<&str>) -> Result<i64, RepositoryError> {
        Ok(quiz_question::count_questions(&self.pool, category).await?)
    }

    async fn find_one_at_offset(
        &self,
        category: Option<&str>,
        offset: i64,
    ) -> Result<Option<QuizQuestion>, RepositoryError> {
        Ok(quiz_question::get_question_at_offset(&self.pool, category, offset).await?)
    }

    async fn find_player_record(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<Option<PlayerScoreRecord>, RepositoryError> {
        Ok(quiz_player::get_player(&self.pool, user_id, chat_id).await?)
    }

    async fn upsert_player_record(
        &self,
        record: &PlayerScoreRecord,
    ) -> Result<(), RepositoryError> {
        Ok(quiz_player::upsert_player(&self.pool, record).await?)
    }

    async fn find_players_in_room(
        &self,
        chat_id: ChatId,
    ) -> Result<Vec<PlayerScoreRecord>, RepositoryError> {
        Ok(quiz_player::get_players_by_chat(&self.pool, chat_id).await?)
    }

    async fn create_question(&self, question: &QuizQuestion) -> Result<bool, RepositoryError> {
        Ok(quiz_question::create_question(&self.pool, question).await?)
    }

    async fn delete_question(&self, question: &QuizQuestion) -> Result<bool, RepositoryError> {
        Ok(quiz_question::delete_question(&self.pool, question).await?)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(health::health_check(&self.pool).await?)
    }
}
