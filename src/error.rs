//! Error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// A rejected request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", .0.message)]
    Validation(FieldError),

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::Validation(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Validation(err) => json!({
                "error": err.message,
                "field": err.field,
                "status": StatusCode::BAD_REQUEST.as_u16(),
            }),
            AppError::NotFound(msg) => json!({
                "error": msg,
                "status": StatusCode::NOT_FOUND.as_u16(),
            }),
            AppError::Store(err) => {
                tracing::error!("Database error: {}", err);
                json!({
                    "error": "Database error occurred",
                    "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                })
            }
        };

        (self.status(), Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        let validation = AppError::from(FieldError::new("page", "Page must be at least 1"));
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.to_string(), "Page must be at least 1");

        let missing = AppError::NotFound("Threat with ID 4 not found".to_string());
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let store = AppError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn store_errors_do_not_leak_details() {
        let response = AppError::from(sqlx::Error::Protocol(
            "password authentication failed for user admin".to_string(),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Database error occurred"));
        assert!(!text.contains("password"));
    }
}
