use sqlx::{Pool, Postgres, types::Json};

use crate::models::{
    chat::{ChatId, UserId},
    quiz::{PlayerScoreRecord, ScoreTable},
};

#[derive(Debug, sqlx::FromRow)]
struct PlayerRow {
    user_id: i64,
    chat_id: i64,
    display_name: String,
    scores: Json<ScoreTable>,
}

impl From<PlayerRow> for PlayerScoreRecord {
    fn from(row: PlayerRow) -> Self {
        Self {
            user_id: row.user_id,
            chat_id: row.chat_id,
            display_name: row.display_name,
            scores: row.scores.0,
        }
    }
}

pub async fn get_player(
    pool: &Pool<Postgres>,
    user_id: UserId,
    chat_id: ChatId,
) -> Result<Option<PlayerScoreRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, PlayerRow>(
        r#"
        SELECT user_id, chat_id, display_name, scores
        FROM "quiz_player"
        WHERE user_id = $1 AND chat_id = $2
        "#,
    )
    .bind(user_id)
    .bind(chat_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(PlayerScoreRecord::from))
}

pub async fn get_players_by_chat(
    pool: &Pool<Postgres>,
    chat_id: ChatId,
) -> Result<Vec<PlayerScoreRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PlayerRow>(
        r#"
        SELECT user_id, chat_id, display_name, scores
        FROM "quiz_player"
        WHERE chat_id = $1
        ORDER BY user_id
        "#,
    )
    .bind(chat_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(PlayerScoreRecord::from).collect())
}

pub async fn upsert_player(
    pool: &Pool<Postgres>,
    record: &PlayerScoreRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "quiz_player" (user_id, chat_id, display_name, scores)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, chat_id) DO UPDATE SET
            display_name = EXCLUDED.display_name,
            scores = EXCLUDED.scores,
            updated_at = NOW()
        "#,
    )
    .bind(record.user_id)
    .bind(record.chat_id)
    .bind(&record.display_name)
    .bind(Json(&record.scores))
    .execute(pool)
    .await?;

    Ok(())
}
