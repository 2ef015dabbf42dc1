use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::operations::{
    self as ops, Lesson, Mistake, NewMistake,
};
use crate::domain::{Level, MistakeType, Role, Scenario};
use crate::services::tutor::{DetectedMistake, Tutor};
use crate::services::ServiceError;

pub const DEFAULT_USERNAME: &str = "guest";
const MAX_USERNAME_LEN: usize = 64;
const LESSON_NOT_FOUND: &str = "Lesson not found";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedSession {
    pub session_id: String,
    pub message: String,
    pub level: Level,
    pub scenario: Scenario,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct TutorReply {
    pub message: String,
    pub mistakes: Option<Vec<DetectedMistake>>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct SessionTranscript {
    pub lesson: Lesson,
    pub messages: Vec<TranscriptEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MistakeEntry {
    pub original: String,
    pub corrected: String,
    #[serde(rename = "type")]
    pub mistake_type: MistakeType,
    pub explanation: String,
}

impl From<&Mistake> for MistakeEntry {
    fn from(m: &Mistake) -> Self {
        Self {
            original: m.original_text.clone(),
            corrected: m.corrected_text.clone(),
            mistake_type: m.mistake_type,
            explanation: m.explanation.clone(),
        }
    }
}

/// Every category is always present, empty or not.
#[derive(Debug, Default, Serialize)]
pub struct MistakesByType {
    pub grammar: Vec<MistakeEntry>,
    pub spelling: Vec<MistakeEntry>,
    #[serde(rename = "word-order")]
    pub word_order: Vec<MistakeEntry>,
    pub vocabulary: Vec<MistakeEntry>,
}

impl MistakesByType {
    fn push(&mut self, entry: MistakeEntry) {
        let bucket = match entry.mistake_type {
            MistakeType::Grammar => &mut self.grammar,
            MistakeType::Spelling => &mut self.spelling,
            MistakeType::WordOrder => &mut self.word_order,
            MistakeType::Vocabulary => &mut self.vocabulary,
        };
        bucket.push(entry);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedMessage {
    pub user_message: String,
    pub mistakes: Vec<MistakeEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeSummary {
    pub total_mistakes: usize,
    pub mistakes_by_type: MistakesByType,
    pub all_mistakes: Vec<FlaggedMessage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecap {
    pub recap: String,
    pub total_mistakes: usize,
}

pub fn normalize_username(username: Option<&str>) -> Result<String, ServiceError> {
    let trimmed = username.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(DEFAULT_USERNAME.to_string());
    }
    if trimmed.chars().count() > MAX_USERNAME_LEN {
        return Err(ServiceError::validation("Username is too long"));
    }
    Ok(trimmed.to_string())
}

/// Lesson ids travel as strings; anything that is not a positive integer cannot
/// name a lesson.
pub fn parse_lesson_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

async fn load_lesson(pool: &SqlitePool, raw_id: &str) -> Result<Lesson, ServiceError> {
    let id = parse_lesson_id(raw_id).ok_or(ServiceError::NotFound(LESSON_NOT_FOUND))?;
    ops::get_lesson(pool, id)
        .await?
        .ok_or(ServiceError::NotFound(LESSON_NOT_FOUND))
}

/// Opens a lesson: the model's first line is fetched before anything is written,
/// so a stored lesson always starts with exactly one assistant message.
pub async fn start_session(
    pool: &SqlitePool,
    tutor: &Tutor,
    level: Option<&str>,
    scenario: Option<&str>,
    username: Option<&str>,
) -> Result<StartedSession, ServiceError> {
    let level = level
        .and_then(Level::parse)
        .ok_or_else(|| ServiceError::validation("Invalid level"))?;
    let scenario = match scenario.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Scenario::parse(raw).ok_or_else(|| ServiceError::validation("Invalid scenario"))?,
        None => Scenario::default(),
    };
    let username = normalize_username(username)?;

    let opening = tutor.open_conversation(level, scenario).await?;

    let user = ops::get_or_create_user(pool, &username).await?;
    let mut tx = pool.begin().await?;
    let lesson_id = ops::create_lesson(&mut *tx, user.id, level, scenario).await?;
    ops::create_message(&mut *tx, lesson_id, Role::Assistant, &opening).await?;
    tx.commit().await?;

    info!(lesson_id, user_id = user.id, %level, %scenario, "lesson started");

    Ok(StartedSession {
        session_id: lesson_id.to_string(),
        message: opening,
        level,
        scenario,
        user_id: user.id,
    })
}

pub async fn send_message(
    pool: &SqlitePool,
    tutor: &Tutor,
    session_id: &str,
    message: &str,
    correct_immediately: bool,
) -> Result<TutorReply, ServiceError> {
    let lesson = load_lesson(pool, session_id).await?;
    if lesson.is_ended() {
        return Err(ServiceError::validation("Lesson already ended"));
    }
    let message = message.trim();
    if message.is_empty() {
        return Err(ServiceError::validation("Message is required"));
    }

    let analysis = tutor.detect_mistakes(message, lesson.level).await;
    for mistake in &analysis.mistakes {
        ops::create_mistake(
            pool,
            lesson.id,
            lesson.user_id,
            &NewMistake {
                original: &mistake.original,
                corrected: &mistake.corrected,
                mistake_type: mistake.mistake_type,
                explanation: &mistake.explanation,
            },
        )
        .await?;
    }
    if analysis.has_mistakes {
        debug!(lesson_id = lesson.id, count = analysis.mistakes.len(), "mistakes recorded");
    }

    ops::create_message(pool, lesson.id, Role::User, message).await?;
    let history = ops::list_lesson_messages(pool, lesson.id).await?;

    let corrections = (correct_immediately && analysis.has_mistakes)
        .then_some(analysis.mistakes.as_slice());
    let reply = tutor
        .reply(lesson.level, lesson.scenario, &history, corrections)
        .await?;

    ops::create_message(pool, lesson.id, Role::Assistant, &reply).await?;

    Ok(TutorReply {
        message: reply,
        mistakes: analysis.has_mistakes.then_some(analysis.mistakes),
    })
}

pub async fn get_session(pool: &SqlitePool, session_id: &str) -> Result<SessionTranscript, ServiceError> {
    let lesson = load_lesson(pool, session_id).await?;
    let messages = ops::list_lesson_messages(pool, lesson.id)
        .await?
        .into_iter()
        .map(|m| TranscriptEntry {
            role: m.role,
            content: m.content,
            timestamp: m.timestamp,
        })
        .collect();

    Ok(SessionTranscript { lesson, messages })
}

/// Mistake summary for a lesson. The first call also ends the lesson and folds
/// its totals into the user's per-level stats; later calls only read. Ended
/// lessons take no further messages, so repeated summaries stay identical.
pub async fn finish_session(pool: &SqlitePool, session_id: &str) -> Result<MistakeSummary, ServiceError> {
    let lesson = load_lesson(pool, session_id).await?;
    let mistakes = ops::list_lesson_mistakes(pool, lesson.id).await?;
    let message_count = ops::count_lesson_messages(pool, lesson.id).await?;

    let newly_ended =
        ops::complete_lesson(pool, &lesson, message_count, mistakes.len() as i64).await?;
    if newly_ended {
        info!(
            lesson_id = lesson.id,
            messages = message_count,
            mistakes = mistakes.len(),
            "lesson finished"
        );
    } else {
        debug!(lesson_id = lesson.id, "lesson already finished, stats unchanged");
    }

    Ok(summarize_mistakes(&mistakes))
}

pub fn summarize_mistakes(mistakes: &[Mistake]) -> MistakeSummary {
    let mut by_type = MistakesByType::default();
    let mut all = Vec::with_capacity(mistakes.len());

    for mistake in mistakes {
        let entry = MistakeEntry::from(mistake);
        by_type.push(entry.clone());
        all.push(FlaggedMessage {
            user_message: mistake.original_text.clone(),
            mistakes: vec![entry],
        });
    }

    MistakeSummary {
        total_mistakes: mistakes.len(),
        mistakes_by_type: by_type,
        all_mistakes: all,
    }
}

pub async fn session_recap(
    pool: &SqlitePool,
    tutor: &Tutor,
    session_id: &str,
) -> Result<LessonRecap, ServiceError> {
    let lesson = load_lesson(pool, session_id).await?;
    let mistakes = ops::list_lesson_mistakes(pool, lesson.id).await?;
    let recap = tutor.generate_recap(&mistakes).await;

    Ok(LessonRecap {
        recap,
        total_mistakes: mistakes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: i64, mistake_type: MistakeType) -> Mistake {
        Mistake {
            id,
            lesson_id: 1,
            user_id: 1,
            original_text: format!("wrong {id}"),
            corrected_text: format!("right {id}"),
            mistake_type,
            explanation: "because".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            practiced: false,
        }
    }

    #[test]
    fn lesson_ids_must_be_positive_integers() {
        assert_eq!(parse_lesson_id("42"), Some(42));
        assert_eq!(parse_lesson_id(" 7 "), Some(7));
        assert_eq!(parse_lesson_id("0"), None);
        assert_eq!(parse_lesson_id("-3"), None);
        assert_eq!(parse_lesson_id("abc"), None);
    }

    #[test]
    fn blank_username_falls_back_to_guest() {
        assert_eq!(normalize_username(None).unwrap(), "guest");
        assert_eq!(normalize_username(Some("   ")).unwrap(), "guest");
        assert_eq!(normalize_username(Some(" anna ")).unwrap(), "anna");
        assert!(normalize_username(Some(&"x".repeat(65))).is_err());
    }

    #[test]
    fn summary_groups_by_type_and_keeps_all_buckets() {
        let summary = summarize_mistakes(&[
            stored(1, MistakeType::Grammar),
            stored(2, MistakeType::WordOrder),
            stored(3, MistakeType::Grammar),
        ]);
        assert_eq!(summary.total_mistakes, 3);
        assert_eq!(summary.mistakes_by_type.grammar.len(), 2);
        assert_eq!(summary.mistakes_by_type.word_order.len(), 1);
        assert_eq!(summary.all_mistakes[1].user_message, "wrong 2");

        let json = serde_json::to_value(&summary).unwrap();
        for key in ["grammar", "spelling", "word-order", "vocabulary"] {
            assert!(json["mistakesByType"][key].is_array(), "missing {key}");
        }
    }
}
