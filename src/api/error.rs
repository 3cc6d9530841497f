//! API error handling for consistent JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::gateway::GatewayError;
use crate::interview::InterviewError;

/// API error type that converts to `{ "error": message }` responses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// HTTP status for an interview failure.
pub fn status_for(err: &InterviewError) -> StatusCode {
    match err {
        InterviewError::InvalidRole(_) => StatusCode::BAD_REQUEST,
        InterviewError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        InterviewError::InvalidState(_)
        | InterviewError::SessionConflict
        | InterviewError::InterviewIncomplete { .. } => StatusCode::CONFLICT,
        InterviewError::Gateway(GatewayError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
        InterviewError::Gateway(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<InterviewError> for ApiError {
    fn from(err: InterviewError) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&InterviewError::SessionConflict),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&InterviewError::InterviewIncomplete {
                answered: 1,
                total: 5
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&InterviewError::InvalidRole("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GatewayError::Upstream("quota".into()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&GatewayError::Parse("missing".into()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&GatewayError::Cancelled.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_gateway_message_passes_through() {
        let err: ApiError =
            InterviewError::from(GatewayError::Generation("no questions".into())).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.message(), "question generation failed: no questions");
    }
}
