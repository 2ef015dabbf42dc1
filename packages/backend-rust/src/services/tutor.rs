use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::operations::{Message, Mistake};
use crate::domain::{Level, MistakeType, Role, Scenario};
use crate::services::llm_provider::{ChatMessage, ChatOptions, LLMError, LLMProvider};
use crate::services::prompts;

const CONVERSATION_TEMPERATURE: f32 = 0.8;
const ANALYSIS_TEMPERATURE: f32 = 0.1;
const RECAP_TEMPERATURE: f32 = 0.7;
const WORD_MAX_TOKENS: u32 = 20;
const SENTENCE_MAX_TOKENS: u32 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedMistake {
    pub original: String,
    pub corrected: String,
    #[serde(rename = "type")]
    pub mistake_type: MistakeType,
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakeAnalysis {
    pub has_mistakes: bool,
    pub mistakes: Vec<DetectedMistake>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordTranslation {
    pub word: String,
    pub translation: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    has_mistakes: bool,
    mistakes: Option<Vec<RawMistake>>,
}

#[derive(Debug, Deserialize)]
struct RawMistake {
    original: Option<String>,
    corrected: Option<String>,
    #[serde(rename = "type")]
    mistake_type: Option<String>,
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawWords {
    words: Option<Vec<RawWord>>,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    word: Option<String>,
    translation: Option<String>,
}

/// The tutoring side of the app: every prompt that goes out to the model.
#[derive(Clone)]
pub struct Tutor {
    llm: LLMProvider,
    native_language: String,
}

impl Tutor {
    pub fn new(llm: LLMProvider, native_language: impl Into<String>) -> Self {
        Self {
            llm,
            native_language: native_language.into(),
        }
    }

    pub fn from_env() -> Self {
        let native_language = std::env::var("TUTOR_NATIVE_LANGUAGE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| prompts::DEFAULT_NATIVE_LANGUAGE.to_string());
        Self::new(LLMProvider::from_env(), native_language)
    }

    pub fn llm(&self) -> &LLMProvider {
        &self.llm
    }

    pub fn native_language(&self) -> &str {
        &self.native_language
    }

    fn conversation_options(&self) -> ChatOptions {
        ChatOptions::temperature(CONVERSATION_TEMPERATURE)
            .model(self.llm.config().conversation_model.clone())
    }

    pub async fn open_conversation(
        &self,
        level: Level,
        scenario: Scenario,
    ) -> Result<String, LLMError> {
        let messages = [
            ChatMessage::system(prompts::system_prompt(level, scenario)),
            ChatMessage::user(prompts::OPENING_INSTRUCTION),
        ];
        self.llm.complete(&messages, &self.conversation_options()).await
    }

    /// Next tutor turn given the stored transcript. `corrections` adds a system
    /// turn asking the model to weave the right forms into its reply.
    pub async fn reply(
        &self,
        level: Level,
        scenario: Scenario,
        history: &[Message],
        corrections: Option<&[DetectedMistake]>,
    ) -> Result<String, LLMError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(prompts::system_prompt(level, scenario)));

        if let Some(mistakes) = corrections.filter(|m| !m.is_empty()) {
            let mistakes_json = serde_json::to_string(mistakes)?;
            messages.push(ChatMessage::system(prompts::correction_hint(&mistakes_json)));
        }

        messages.extend(history.iter().map(|m| match m.role {
            Role::User => ChatMessage::user(m.content.clone()),
            Role::Assistant => ChatMessage::assistant(m.content.clone()),
        }));

        self.llm.complete(&messages, &self.conversation_options()).await
    }

    /// Never fails: a model or parsing problem is logged and reported as a clean message.
    pub async fn detect_mistakes(&self, message: &str, level: Level) -> MistakeAnalysis {
        let options = ChatOptions::temperature(ANALYSIS_TEMPERATURE).json();
        let result = self
            .llm
            .complete_with_system(
                &prompts::mistake_detection_prompt(level, &self.native_language),
                &prompts::mistake_detection_request(message),
                &options,
            )
            .await;

        match result {
            Ok(raw) => parse_mistake_analysis(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "mistake analysis was not valid JSON");
                MistakeAnalysis::default()
            }),
            Err(e) => {
                warn!(error = %e, "mistake detection failed");
                MistakeAnalysis::default()
            }
        }
    }

    pub async fn generate_recap(&self, mistakes: &[Mistake]) -> String {
        let mistakes_json = if mistakes.is_empty() {
            None
        } else {
            let summary: Vec<DetectedMistake> = mistakes
                .iter()
                .map(|m| DetectedMistake {
                    original: m.original_text.clone(),
                    corrected: m.corrected_text.clone(),
                    mistake_type: m.mistake_type,
                    explanation: m.explanation.clone(),
                })
                .collect();
            serde_json::to_string(&summary).ok()
        };

        let result = self
            .llm
            .complete_with_system(
                prompts::RECAP_PROMPT,
                &prompts::recap_request(mistakes_json.as_deref()),
                &ChatOptions::temperature(RECAP_TEMPERATURE),
            )
            .await;

        match result {
            Ok(recap) => recap.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "recap generation failed");
                prompts::RECAP_FALLBACK.to_string()
            }
        }
    }

    pub async fn translate_word(&self, word: &str) -> Result<String, LLMError> {
        let options = ChatOptions::temperature(ANALYSIS_TEMPERATURE).max_tokens(WORD_MAX_TOKENS);
        let translation = self
            .llm
            .complete_with_system(
                &prompts::word_translation_prompt(&self.native_language),
                &prompts::translation_request(word),
                &options,
            )
            .await?;
        Ok(translation.trim().to_string())
    }

    pub async fn translate_sentence(&self, sentence: &str) -> Result<String, LLMError> {
        let options =
            ChatOptions::temperature(ANALYSIS_TEMPERATURE).max_tokens(SENTENCE_MAX_TOKENS);
        let translation = self
            .llm
            .complete_with_system(
                &prompts::sentence_translation_prompt(&self.native_language),
                &prompts::translation_request(sentence),
                &options,
            )
            .await?;
        Ok(translation.trim().to_string())
    }

    pub async fn analyze_words(
        &self,
        text: &str,
        level: Level,
    ) -> Result<Vec<WordTranslation>, LLMError> {
        let options = ChatOptions::temperature(ANALYSIS_TEMPERATURE).json();
        let raw = self
            .llm
            .complete_with_system(
                &prompts::word_analysis_prompt(level, &self.native_language),
                &prompts::word_analysis_request(text),
                &options,
            )
            .await?;
        let words = parse_word_analysis(&raw)?;
        debug!(count = words.len(), "significant words picked");
        Ok(words)
    }

    pub async fn synthesize(&self, text: &str) -> Result<Bytes, LLMError> {
        self.llm.speech(text).await
    }
}

pub fn parse_mistake_analysis(raw: &str) -> Result<MistakeAnalysis, serde_json::Error> {
    let parsed: RawAnalysis = serde_json::from_str(&extract_json_from_response(raw))?;
    if !parsed.has_mistakes {
        return Ok(MistakeAnalysis::default());
    }

    let candidates = parsed
        .mistakes
        .unwrap_or_default()
        .into_iter()
        .filter_map(|m| {
            let mistake_type = match m.mistake_type.as_deref().and_then(MistakeType::parse) {
                Some(t) => t,
                None => {
                    debug!(kind = ?m.mistake_type, "dropping mistake with unknown type");
                    return None;
                }
            };
            Some(DetectedMistake {
                original: m.original?.trim().to_string(),
                corrected: m.corrected?.trim().to_string(),
                mistake_type,
                explanation: m.explanation.unwrap_or_default().trim().to_string(),
            })
        })
        .collect();

    let mistakes = retain_real_mistakes(candidates);
    Ok(MistakeAnalysis {
        has_mistakes: !mistakes.is_empty(),
        mistakes,
    })
}

/// Drops "corrections" that only change case or surrounding whitespace.
pub fn retain_real_mistakes(mistakes: Vec<DetectedMistake>) -> Vec<DetectedMistake> {
    mistakes
        .into_iter()
        .filter(|m| normalize(&m.original) != normalize(&m.corrected))
        .collect()
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn parse_word_analysis(raw: &str) -> Result<Vec<WordTranslation>, serde_json::Error> {
    let parsed: RawWords = serde_json::from_str(&extract_json_from_response(raw))?;
    Ok(parsed
        .words
        .unwrap_or_default()
        .into_iter()
        .filter_map(|w| {
            let word = w.word?.trim().to_string();
            if word.is_empty() {
                return None;
            }
            Some(WordTranslation {
                word,
                translation: w.translation.unwrap_or_default().trim().to_string(),
            })
        })
        .collect())
}

fn extract_json_from_response(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if start < end {
                return trimmed[start..=end].to_string();
            }
        }
    }

    trimmed.to_string()
}
