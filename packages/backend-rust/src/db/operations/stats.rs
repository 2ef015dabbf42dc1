use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::db::{format_naive_iso, now_naive};
use crate::domain::Level;

#[derive(Debug, Clone, Serialize)]
pub struct UserStat {
    pub user_id: i64,
    pub level: Level,
    pub lessons_completed: i64,
    pub total_mistakes: i64,
    pub total_messages: i64,
    pub last_lesson_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TotalStats {
    pub total_lessons: i64,
    pub total_mistakes: i64,
    pub total_messages: i64,
}

/// Counts one more completed lesson at `level`, creating the stats row on first use.
pub async fn record_completed_lesson<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
    level: Level,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO "user_stats" ("userId", "level", "lessonsCompleted", "lastLessonDate")
           VALUES (?, ?, 1, ?)
           ON CONFLICT ("userId", "level") DO UPDATE SET
               "lessonsCompleted" = "user_stats"."lessonsCompleted" + 1,
               "lastLessonDate" = excluded."lastLessonDate""#,
    )
    .bind(user_id)
    .bind(level.as_str())
    .bind(now_naive())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn add_mistakes<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
    level: Level,
    count: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE "user_stats" SET "totalMistakes" = "totalMistakes" + ?
           WHERE "userId" = ? AND "level" = ?"#,
    )
    .bind(count.max(0))
    .bind(user_id)
    .bind(level.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn add_messages<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
    level: Level,
    count: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE "user_stats" SET "totalMessages" = "totalMessages" + ?
           WHERE "userId" = ? AND "level" = ?"#,
    )
    .bind(count.max(0))
    .bind(user_id)
    .bind(level.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_user_stats(pool: &SqlitePool, user_id: i64) -> Result<Vec<UserStat>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "userId", "level", "lessonsCompleted", "totalMistakes", "totalMessages", "lastLessonDate"
           FROM "user_stats"
           WHERE "userId" = ?
           ORDER BY "level" ASC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let level: String = row.try_get("level")?;
            Ok(UserStat {
                user_id: row.try_get("userId")?,
                level: Level::parse(&level).ok_or_else(|| {
                    sqlx::Error::Decode(format!("unexpected level {level:?}").into())
                })?,
                lessons_completed: row.try_get("lessonsCompleted")?,
                total_mistakes: row.try_get("totalMistakes")?,
                total_messages: row.try_get("totalMessages")?,
                last_lesson_date: row
                    .try_get::<Option<NaiveDateTime>, _>("lastLessonDate")?
                    .map(format_naive_iso),
            })
        })
        .collect()
}

pub async fn total_user_stats(pool: &SqlitePool, user_id: i64) -> Result<TotalStats, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT
               COALESCE(SUM("lessonsCompleted"), 0) AS "totalLessons",
               COALESCE(SUM("totalMistakes"), 0) AS "totalMistakes",
               COALESCE(SUM("totalMessages"), 0) AS "totalMessages"
           FROM "user_stats"
           WHERE "userId" = ?"#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(TotalStats {
        total_lessons: row.try_get("totalLessons")?,
        total_mistakes: row.try_get("totalMistakes")?,
        total_messages: row.try_get("totalMessages")?,
    })
}
