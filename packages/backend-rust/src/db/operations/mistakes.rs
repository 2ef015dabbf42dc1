use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::{format_naive_iso, now_naive};
use crate::domain::MistakeType;

#[derive(Debug, Clone, Serialize)]
pub struct Mistake {
    pub id: i64,
    pub lesson_id: i64,
    pub user_id: i64,
    pub original_text: String,
    pub corrected_text: String,
    pub mistake_type: MistakeType,
    pub explanation: String,
    pub timestamp: String,
    pub practiced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MistakeTypeCount {
    pub mistake_type: MistakeType,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct NewMistake<'a> {
    pub original: &'a str,
    pub corrected: &'a str,
    pub mistake_type: MistakeType,
    pub explanation: &'a str,
}

const MISTAKE_COLUMNS: &str = r#""id", "lessonId", "userId", "originalText", "correctedText", "mistakeType", "explanation", "timestamp", "practiced""#;

fn parse_type(value: &str) -> Result<MistakeType, sqlx::Error> {
    MistakeType::parse(value)
        .ok_or_else(|| sqlx::Error::Decode(format!("unexpected mistakeType {value:?}").into()))
}

fn map_mistake(row: &SqliteRow) -> Result<Mistake, sqlx::Error> {
    let mistake_type: String = row.try_get("mistakeType")?;
    Ok(Mistake {
        id: row.try_get("id")?,
        lesson_id: row.try_get("lessonId")?,
        user_id: row.try_get("userId")?,
        original_text: row.try_get("originalText")?,
        corrected_text: row.try_get("correctedText")?,
        mistake_type: parse_type(&mistake_type)?,
        explanation: row.try_get("explanation")?,
        timestamp: format_naive_iso(row.try_get::<NaiveDateTime, _>("timestamp")?),
        practiced: row.try_get("practiced")?,
    })
}

pub async fn create_mistake(
    pool: &SqlitePool,
    lesson_id: i64,
    user_id: i64,
    mistake: &NewMistake<'_>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO "mistakes" (
               "lessonId", "userId", "originalText", "correctedText", "mistakeType", "explanation", "timestamp"
           ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(lesson_id)
    .bind(user_id)
    .bind(mistake.original)
    .bind(mistake.corrected)
    .bind(mistake.mistake_type.as_str())
    .bind(mistake.explanation)
    .bind(now_naive())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn list_lesson_mistakes(
    pool: &SqlitePool,
    lesson_id: i64,
) -> Result<Vec<Mistake>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {MISTAKE_COLUMNS} FROM "mistakes"
           WHERE "lessonId" = ?
           ORDER BY "timestamp" ASC, "id" ASC"#
    );
    let rows = sqlx::query(&sql).bind(lesson_id).fetch_all(pool).await?;
    rows.iter().map(map_mistake).collect()
}

pub async fn list_user_mistakes(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Mistake>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {MISTAKE_COLUMNS} FROM "mistakes"
           WHERE "userId" = ?
           ORDER BY "timestamp" DESC, "id" DESC
           LIMIT ?"#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_mistake).collect()
}

pub async fn list_unpracticed_mistakes(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Mistake>, sqlx::Error> {
    let sql = format!(
        r#"SELECT {MISTAKE_COLUMNS} FROM "mistakes"
           WHERE "userId" = ? AND "practiced" = 0
           ORDER BY "timestamp" DESC, "id" DESC
           LIMIT ?"#
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    rows.iter().map(map_mistake).collect()
}

pub async fn mark_mistake_practiced(pool: &SqlitePool, mistake_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"UPDATE "mistakes" SET "practiced" = 1 WHERE "id" = ?"#)
        .bind(mistake_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_mistakes_by_type(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<MistakeTypeCount>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "mistakeType", COUNT(*) AS "count"
           FROM "mistakes"
           WHERE "userId" = ?
           GROUP BY "mistakeType"
           ORDER BY "count" DESC, "mistakeType" ASC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let mistake_type: String = row.try_get("mistakeType")?;
            Ok(MistakeTypeCount {
                mistake_type: parse_type(&mistake_type)?,
                count: row.try_get("count")?,
            })
        })
        .collect()
}
