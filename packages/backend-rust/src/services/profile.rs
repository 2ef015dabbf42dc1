use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::operations::{self as ops, Lesson, Mistake, MistakeTypeCount, TotalStats, UserStat};
use crate::services::ServiceError;

const RECENT_LESSONS: i64 = 5;
const RECENT_MISTAKES: i64 = 10;
const UNPRACTICED_MISTAKES: i64 = 10;
const LESSON_HISTORY: i64 = 50;
const USER_NOT_FOUND: &str = "User not found";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUser {
    pub id: i64,
    pub username: String,
    pub member_since: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub by_level: Vec<UserStat>,
    pub total: TotalStats,
    pub mistakes_by_type: Vec<MistakeTypeCount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: ProfileUser,
    pub stats: ProfileStats,
    pub recent_lessons: Vec<Lesson>,
    pub recent_mistakes: Vec<Mistake>,
    pub unpracticed_mistakes: Vec<Mistake>,
}

#[derive(Debug, Serialize)]
pub struct LessonHistory {
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticedMistake {
    pub mistake_id: i64,
    pub practiced: bool,
}

pub async fn user_profile(pool: &SqlitePool, username: &str) -> Result<UserProfile, ServiceError> {
    let user = ops::find_user_by_username(pool, username.trim())
        .await?
        .ok_or(ServiceError::NotFound(USER_NOT_FOUND))?;

    let by_level = ops::list_user_stats(pool, user.id).await?;
    let total = ops::total_user_stats(pool, user.id).await?;
    let mistakes_by_type = ops::count_mistakes_by_type(pool, user.id).await?;
    let recent_lessons = ops::list_user_lessons(pool, user.id, RECENT_LESSONS).await?;
    let recent_mistakes = ops::list_user_mistakes(pool, user.id, RECENT_MISTAKES).await?;
    let unpracticed_mistakes =
        ops::list_unpracticed_mistakes(pool, user.id, UNPRACTICED_MISTAKES).await?;

    Ok(UserProfile {
        user: ProfileUser {
            id: user.id,
            username: user.username,
            member_since: user.created_at,
        },
        stats: ProfileStats {
            by_level,
            total,
            mistakes_by_type,
        },
        recent_lessons,
        recent_mistakes,
        unpracticed_mistakes,
    })
}

pub async fn user_lessons(pool: &SqlitePool, username: &str) -> Result<LessonHistory, ServiceError> {
    let user = ops::find_user_by_username(pool, username.trim())
        .await?
        .ok_or(ServiceError::NotFound(USER_NOT_FOUND))?;
    let lessons = ops::list_user_lessons(pool, user.id, LESSON_HISTORY).await?;
    Ok(LessonHistory { lessons })
}

pub async fn practice_mistake(pool: &SqlitePool, raw_id: &str) -> Result<PracticedMistake, ServiceError> {
    let mistake_id = raw_id
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(ServiceError::NotFound("Mistake not found"))?;

    if !ops::mark_mistake_practiced(pool, mistake_id).await? {
        return Err(ServiceError::NotFound("Mistake not found"));
    }

    Ok(PracticedMistake {
        mistake_id,
        practiced: true,
    })
}
