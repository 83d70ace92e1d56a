pub mod handlers;

use crate::response::write_json;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

/// Standard error body.
///
/// Every error produced by this crate is written in this shape:
///
/// ```json
/// {
///   "error": "invalid content type",
///   "status": 415
/// }
/// ```
///
/// `details` is only present for validation failures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// HTTP status code, repeated in the body for clients that lose it
    pub status: u16,
    /// Optional structured error details (e.g., validation field errors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: status.as_u16(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        write_json(self.status_code(), &self)
    }
}

/// Rejections produced while reading a JSON request body.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The request did not declare `Content-Type: application/json`.
    #[error("invalid content type")]
    InvalidContentType,

    /// The body could not be decoded into the target type.
    #[error("invalid JSON body: {0}")]
    InvalidJsonBody(String),

    #[error("request validation failed")]
    Validation(#[from] ValidationErrors),
}

impl JsonError {
    pub fn status(&self) -> StatusCode {
        match self {
            JsonError::InvalidContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            JsonError::InvalidJsonBody(_) | JsonError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for JsonError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => JsonError::InvalidContentType,
            other => JsonError::InvalidJsonBody(other.body_text()),
        }
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::info!(status = status.as_u16(), error = %self, "rejected JSON request");

        let body = ErrorResponse::new(status, self.to_string());
        let body = match &self {
            JsonError::Validation(errors) => body.with_details(validation_details(errors)),
            _ => body,
        };

        body.into_response()
    }
}

/// Field name to list of `{code, message, params}` objects.
fn validation_details(errors: &ValidationErrors) -> serde_json::Value {
    let details = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<serde_json::Value> = errors
                .iter()
                .map(|err| {
                    serde_json::json!({
                        "code": err.code,
                        "message": err.message,
                        "params": err.params,
                    })
                })
                .collect();
            (field.to_string(), serde_json::Value::Array(messages))
        })
        .collect::<serde_json::Map<_, _>>();

    serde_json::Value::Object(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_status_in_body() {
        let response = ErrorResponse::new(StatusCode::CONFLICT, "already exists").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let json = body_json(response).await;
        assert_eq!(json["error"], "already exists");
        assert_eq!(json["status"], 409);
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_json_error_status_codes() {
        assert_eq!(
            JsonError::InvalidContentType.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            JsonError::InvalidJsonBody("eof".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            JsonError::Validation(ValidationErrors::new()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_invalid_content_type_body() {
        let response = JsonError::InvalidContentType.into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid content type");
        assert_eq!(json["status"], 415);
    }
}
