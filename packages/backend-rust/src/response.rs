use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::ServiceError;

const GENERIC_SERVER_ERROR: &str = "Server error";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            GENERIC_SERVER_ERROR.to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(message) => Self::validation(message),
            ServiceError::NotFound(message) => Self::not_found(message),
            ServiceError::Database(e) => {
                tracing::error!(error = %e, "database error");
                Self::internal(e.to_string())
            }
            ServiceError::Llm(e) => {
                tracing::error!(error = %e, "LLM provider error");
                Self::internal(e.to_string())
            }
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_errors_hide_their_message() {
        let response = AppError::internal("disk on fire").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Server error");
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn operational_errors_keep_their_message() {
        let body = body_json(AppError::not_found("Lesson not found").into_response()).await;
        assert_eq!(body["error"], "Lesson not found");
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[test]
    fn service_errors_map_to_statuses() {
        let not_found: AppError = ServiceError::NotFound("Lesson not found").into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let invalid: AppError = ServiceError::validation("Invalid level").into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let db: AppError = ServiceError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
