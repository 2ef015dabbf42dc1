pub mod llm_provider;
pub mod profile;
pub mod prompts;
pub mod session;
pub mod tutor;

use thiserror::Error;

use crate::services::llm_provider::LLMError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
