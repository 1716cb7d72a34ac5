use sqlx::{Pool, Postgres};
use tracing::warn;

use crate::models::quiz::QuizQuestion;

pub async fn count_questions(
    pool: &Pool<Postgres>,
    category: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM "quiz_question"
        WHERE ($1::TEXT IS NULL OR category = $1)
        "#,
    )
    .bind(category)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

pub async fn get_question_at_offset(
    pool: &Pool<Postgres>,
    category: Option<&str>,
    offset: i64,
) -> Result<Option<QuizQuestion>, sqlx::Error> {
    sqlx::query_as::<_, QuizQuestion>(
        r#"
        SELECT answer, category
        FROM "quiz_question"
        WHERE ($1::TEXT IS NULL OR category = $1)
        ORDER BY id
        OFFSET $2
        LIMIT 1
        "#,
    )
    .bind(category)
    .bind(offset)
    .fetch_optional(pool)
    .await
}

/// Returns false if the (answer, category) pair is already stored.
pub async fn create_question(
    pool: &Pool<Postgres>,
    question: &QuizQuestion,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO "quiz_question" (answer, category)
        VALUES ($1, $2)
        ON CONFLICT (answer, category) DO NOTHING
        "#,
    )
    .bind(&question.answer)
    .bind(&question.category)
    .execute(pool)
    .await?;

    if row.rows_affected() == 0 {
        warn!("Skipping question creation: pair already exists");
        return Ok(false);
    }

    Ok(true)
}

pub async fn delete_question(
    pool: &Pool<Postgres>,
    question: &QuizQuestion,
) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        r#"
        DELETE FROM "quiz_question"
        WHERE answer = $1 AND category = $2
        "#,
    )
    .bind(&question.answer)
    .bind(&question.category)
    .execute(pool)
    .await?;

    Ok(row.rows_affected() > 0)
}
