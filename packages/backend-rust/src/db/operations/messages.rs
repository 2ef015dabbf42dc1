use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::db::{format_naive_iso, now_naive};
use crate::domain::Role;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub lesson_id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

fn map_message(row: &SqliteRow) -> Result<Message, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(Message {
        id: row.try_get("id")?,
        lesson_id: row.try_get("lessonId")?,
        role: Role::parse(&role)
            .ok_or_else(|| sqlx::Error::Decode(format!("unexpected role {role:?}").into()))?,
        content: row.try_get("content")?,
        timestamp: format_naive_iso(row.try_get::<NaiveDateTime, _>("timestamp")?),
    })
}

pub async fn create_message<'e, E: SqliteExecutor<'e>>(
    executor: E,
    lesson_id: i64,
    role: Role,
    content: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO "messages" ("lessonId", "role", "content", "timestamp") VALUES (?, ?, ?, ?)"#,
    )
    .bind(lesson_id)
    .bind(role.as_str())
    .bind(content)
    .bind(now_naive())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Transcript in the order it was written; the row id breaks timestamp ties.
pub async fn list_lesson_messages(
    pool: &SqlitePool,
    lesson_id: i64,
) -> Result<Vec<Message>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "id", "lessonId", "role", "content", "timestamp"
           FROM "messages"
           WHERE "lessonId" = ?
           ORDER BY "timestamp" ASC, "id" ASC"#,
    )
    .bind(lesson_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_message).collect()
}

pub async fn count_lesson_messages(pool: &SqlitePool, lesson_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM "messages" WHERE "lessonId" = ?"#)
        .bind(lesson_id)
        .fetch_one(pool)
        .await
}
