use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::db::operations::stats;
use crate::db::{format_naive_iso, now_naive};
use crate::domain::{Level, Scenario};

/// Stored lesson row. Rows go out on the wire with snake_case field names.
#[derive(Debug, Clone, Serialize)]
pub struct Lesson {
    pub id: i64,
    pub user_id: i64,
    pub level: Level,
    pub scenario: Scenario,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub total_messages: i64,
    pub total_mistakes: i64,
}

impl Lesson {
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

const LESSON_COLUMNS: &str = r#""id", "userId", "level", "scenario", "startedAt", "endedAt", "totalMessages", "totalMistakes""#;

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::Decode(format!("unexpected {column} value {value:?}").into())
}

fn map_lesson(row: &SqliteRow) -> Result<Lesson, sqlx::Error> {
    let level: String = row.try_get("level")?;
    let scenario: String = row.try_get("scenario")?;
    Ok(Lesson {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        level: Level::parse(&level).ok_or_else(|| decode_error("level", &level))?,
        scenario: Scenario::parse(&scenario).ok_or_else(|| decode_error("scenario", &scenario))?,
        started_at: format_naive_iso(row.try_get::<NaiveDateTime, _>("startedAt")?),
        ended_at: row
            .try_get::<Option<NaiveDateTime>, _>("endedAt")?
            .map(format_naive_iso),
        total_messages: row.try_get("totalMessages")?,
        total_mistakes: row.try_get("totalMistakes")?,
    })
}

pub async fn create_lesson<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
    level: Level,
    scenario: Scenario,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO "lessons" ("userId", "level", "scenario", "startedAt") VALUES (?, ?, ?, ?)"#,
    )
    .bind(user_id)
    .bind(level.as_str())
    .bind(scenario.as_str())
    .bind(now_naive())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_lesson(pool: &SqlitePool, lesson_id: i64) -> Result<Option<Lesson>, sqlx::Error> {
    let sql = format!(r#"SELECT {LESSON_COLUMNS} FROM "lessons" WHERE "id" = ?"#);
    let row = sqlx::query(&sql)
        .bind(lesson_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_lesson).transpose()
}

pub async fn list_user_lessons(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Lesson>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {LESSON_COLUMNS} FROM "lessons"
           WHERE "userId" = ?
           ORDER BY "startedAt" DESC, "id" DESC
           LIMIT ?"#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_lesson).collect()
}

/// Stamps `endedAt` and the lesson totals on a lesson that is still open.
///
/// Returns `false` when the lesson is unknown or already ended.
pub async fn end_lesson<'e, E: SqliteExecutor<'e>>(
    executor: E,
    lesson_id: i64,
    total_messages: i64,
    total_mistakes: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE "lessons"
           SET "endedAt" = ?, "totalMessages" = ?, "totalMistakes" = ?
           WHERE "id" = ? AND "endedAt" IS NULL"#,
    )
    .bind(now_naive())
    .bind(total_messages)
    .bind(total_mistakes)
    .bind(lesson_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Ends an open lesson and folds its totals into the per-level user stats in one
/// transaction.
///
/// Returns `false` without touching anything when the lesson was already ended,
/// so the aggregate counters only ever count a lesson once.
pub async fn complete_lesson(
    pool: &SqlitePool,
    lesson: &Lesson,
    total_messages: i64,
    total_mistakes: i64,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    if !end_lesson(&mut *tx, lesson.id, total_messages, total_mistakes).await? {
        tx.rollback().await?;
        return Ok(false);
    }

    stats::record_completed_lesson(&mut *tx, lesson.user_id, lesson.level).await?;
    if total_mistakes > 0 {
        stats::add_mistakes(&mut *tx, lesson.user_id, lesson.level, total_mistakes).await?;
    }
    stats::add_messages(&mut *tx, lesson.user_id, lesson.level, total_messages).await?;

    tx.commit().await?;
    Ok(true)
}
