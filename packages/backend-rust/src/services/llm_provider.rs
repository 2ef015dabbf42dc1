use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_CONVERSATION_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_API_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_TTS_MODEL: &str = "tts-1";
const DEFAULT_TTS_VOICE: &str = "nova";
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub api_key: Option<String>,
    /// Model for analysis, translation and recaps.
    pub model: String,
    /// Model that plays the role-play partner.
    pub conversation_model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
    pub max_retries: usize,
    pub speech: SpeechConfig,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub model: String,
    pub voice: String,
    pub speed: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_TTS_MODEL.to_string(),
            voice: DEFAULT_TTS_VOICE.to_string(),
            speed: 1.0,
        }
    }
}

impl LLMConfig {
    pub fn from_env() -> Self {
        let api_key = env_string("LLM_API_KEY").or_else(|| env_string("OPENAI_API_KEY"));
        let model = env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let conversation_model = env_string("LLM_CONVERSATION_MODEL")
            .unwrap_or_else(|| DEFAULT_CONVERSATION_MODEL.to_string());
        let api_endpoint = env_string("LLM_API_ENDPOINT")
            .or_else(|| env_string("LLM_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());
        let timeout = Duration::from_millis(env_u64("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS));
        let max_retries = env_u64("LLM_MAX_RETRIES").unwrap_or(0).min(5) as usize;

        let defaults = SpeechConfig::default();
        let speech = SpeechConfig {
            model: env_string("TTS_MODEL").unwrap_or(defaults.model),
            voice: env_string("TTS_VOICE").unwrap_or(defaults.voice),
            speed: env_string("TTS_SPEED")
                .and_then(|v| v.parse::<f32>().ok())
                .map(|v| v.clamp(0.25, 4.0))
                .unwrap_or(defaults.speed),
        };

        Self::new(api_key, api_endpoint)
            .with_models(model, conversation_model)
            .with_timeout(timeout)
            .with_max_retries(max_retries)
            .with_speech(speech)
    }

    pub fn new(api_key: Option<String>, api_endpoint: impl Into<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            conversation_model: DEFAULT_CONVERSATION_MODEL.to_string(),
            api_endpoint: normalize_endpoint(api_endpoint.into()),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: 0,
            speech: SpeechConfig::default(),
        }
    }

    pub fn with_models(mut self, model: String, conversation_model: String) -> Self {
        self.model = model;
        self.conversation_model = conversation_model;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_speech(mut self, speech: SpeechConfig) -> Self {
        self.speech = speech;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Per-call knobs layered over the provider defaults.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_object: bool,
}

impl ChatOptions {
    pub fn temperature(value: f32) -> Self {
        Self { temperature: Some(value), ..Self::default() }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = Some(value);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_object = true;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

impl ChatResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("LLM not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

#[derive(Clone)]
pub struct LLMProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LLMProvider {
    pub fn from_env() -> Self {
        Self::new(LLMConfig::from_env())
    }

    pub fn new(config: LLMConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    pub fn is_available(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|v| !v.trim().is_empty())
            && !self.config.model.trim().is_empty()
            && !self.config.api_endpoint.trim().is_empty()
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, LLMError> {
        let api_key = self.api_key()?;
        let url = self.url("chat/completions");

        let model = options.model.as_deref().unwrap_or(&self.config.model);
        let mut payload = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false
        });
        if let Some(temperature) = options.temperature {
            payload["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            payload["max_tokens"] = serde_json::json!(max_tokens);
        }
        if options.json_object {
            payload["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let bytes = self.post_with_retry(&url, api_key, &payload).await?;
        match serde_json::from_slice(&bytes) {
            Ok(v) => Ok(v),
            Err(e) => {
                let body_str = String::from_utf8_lossy(&bytes);
                tracing::error!("Failed to parse LLM response JSON: {}. Body: {}", e, body_str);
                Err(LLMError::Json(e))
            }
        }
    }

    /// Single chat round-trip returning the first choice's text.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<String, LLMError> {
        let response = self.chat(messages, options).await?;
        response.first_content().map(|s| s.to_string()).ok_or(LLMError::EmptyChoices)
    }

    pub async fn complete_with_system(
        &self,
        system: &str,
        user: &str,
        options: &ChatOptions,
    ) -> Result<String, LLMError> {
        let messages = [ChatMessage::system(system), ChatMessage::user(user)];
        self.complete(&messages, options).await
    }

    /// Synthesizes `text` into MP3 audio.
    pub async fn speech(&self, text: &str) -> Result<Bytes, LLMError> {
        let api_key = self.api_key()?;
        let url = self.url("audio/speech");
        let payload = serde_json::json!({
            "model": self.config.speech.model,
            "voice": self.config.speech.voice,
            "input": text,
            "speed": self.config.speech.speed,
            "response_format": "mp3"
        });

        self.post_with_retry(&url, api_key, &payload).await
    }

    fn api_key(&self) -> Result<&str, LLMError> {
        self.config
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(LLMError::NotConfigured("LLM_API_KEY"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_endpoint.trim_end_matches('/'), path)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        api_key: &str,
        payload: &serde_json::Value,
    ) -> Result<Bytes, LLMError> {
        let max_retries = self.config.max_retries;
        let mut last_error: Option<LLMError> = None;

        for retry in 0..=max_retries {
            match self.client.post(url).bearer_auth(api_key).json(payload).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.bytes().await?);
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = LLMError::HttpStatus { status, body };
                    if retry < max_retries && is_retryable(status) {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, ?status, "LLM request failed, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = LLMError::Request(e);
                    if retry < max_retries {
                        let backoff = Duration::from_millis(BASE_BACKOFF_MS * (1 << retry));
                        warn!(retry, "LLM request error, retrying");
                        sleep(backoff).await;
                        last_error = Some(err);
                        continue;
                    }
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(LLMError::NotConfigured("unknown")))
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn normalize_endpoint(endpoint: String) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
