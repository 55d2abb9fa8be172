use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Error type rendered at the HTTP edge.
///
/// Every variant serialises as `{"detail": "..."}`. Variants that wrap an
/// underlying cause log it and keep it out of the response body.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    /// A request-scoped failure reported with a fixed public message.
    #[error("{message}: {source}")]
    ProcessingError {
        message: String,
        source: anyhow::Error,
    },

    /// An extractor rejection that keeps the status axum chose for it.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn processing(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AppError::ProcessingError {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::UnprocessableEntity(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Rejected { status, .. } => *status,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_)
            | AppError::ProcessingError { .. }
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                AppError::UnprocessableEntity(anyhow::anyhow!(err.body_text()))
            }
            JsonRejection::JsonSyntaxError(err) => {
                AppError::BadRequest(anyhow::anyhow!(err.body_text()))
            }
            // Oversized bodies (413) and a missing content type (415) among others.
            other => AppError::Rejected {
                status: other.status(),
                message: other.body_text(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let detail = match self {
            AppError::ValidationError(err) => format!("Validation error: {}", err),
            AppError::BadRequest(err)
            | AppError::UnprocessableEntity(err)
            | AppError::NotFound(err) => err.to_string(),
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal server error");
                "Internal server error".to_string()
            }
            AppError::ProcessingError { message, source } => {
                tracing::error!(error = ?source, "{}", message);
                message
            }
            AppError::Rejected { message, .. } | AppError::ServiceUnavailable(message) => message,
            AppError::ConfigError(err) => {
                tracing::error!(error = ?err, "Configuration error");
                "Configuration error".to_string()
            }
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn processing_error_hides_the_cause() {
        let err = AppError::processing(
            "Error processing text",
            anyhow::anyhow!("index out of bounds in linker"),
        );

        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Error processing text");
    }

    #[tokio::test]
    async fn service_unavailable_keeps_its_message() {
        let err = AppError::ServiceUnavailable("Model not properly loaded: missing file".into());

        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["detail"], "Model not properly loaded: missing file");
    }

    #[tokio::test]
    async fn rejection_keeps_its_status() {
        let err = AppError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".into(),
        };

        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["detail"], "length limit exceeded");
    }

    #[tokio::test]
    async fn internal_error_is_generic() {
        let (status, body) = render(AppError::from(anyhow::anyhow!("secret"))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }
}
