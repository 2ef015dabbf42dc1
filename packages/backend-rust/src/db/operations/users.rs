use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::db::{format_naive_iso, now_naive};

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

fn map_user(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        created_at: format_naive_iso(row.try_get::<NaiveDateTime, _>("createdAt")?),
    })
}

pub async fn create_user(pool: &SqlitePool, username: &str) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(r#"INSERT INTO "users" ("username", "createdAt") VALUES (?, ?)"#)
        .bind(username)
        .bind(now_naive())
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT "id", "username", "createdAt" FROM "users" WHERE "username" = ? LIMIT 1"#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(map_user).transpose()
}

/// Returns the user with `username`, inserting it first when absent.
///
/// Two requests racing on a new username both end up with the same row:
/// the insert is a no-op on conflict and the follow-up select reads the winner.
pub async fn get_or_create_user(pool: &SqlitePool, username: &str) -> Result<User, sqlx::Error> {
    if let Some(user) = find_user_by_username(pool, username).await? {
        return Ok(user);
    }

    sqlx::query(
        r#"INSERT INTO "users" ("username", "createdAt") VALUES (?, ?)
           ON CONFLICT ("username") DO NOTHING"#,
    )
    .bind(username)
    .bind(now_naive())
    .execute(pool)
    .await?;

    find_user_by_username(pool, username)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}
