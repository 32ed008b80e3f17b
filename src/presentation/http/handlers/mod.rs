pub mod chat_session_handler;
pub mod feedback_handler;

pub use chat_session_handler::ChatSessionHandler;
pub use feedback_handler::FeedbackHandler;

use axum::{Json, http::StatusCode};

use crate::application::errors::{ChatError, UpstreamFailure};
use crate::presentation::http::dto::ApiResponse;

pub fn error_status(error: &ChatError) -> StatusCode {
    match error {
        ChatError::Validation(_) => StatusCode::BAD_REQUEST,
        ChatError::NotFound(_) => StatusCode::NOT_FOUND,
        ChatError::Conflict(_) | ChatError::Cancelled => StatusCode::CONFLICT,
        ChatError::Upstream { failure, .. } => match failure {
            UpstreamFailure::RetrievalTimeout | UpstreamFailure::GenerationTimeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            UpstreamFailure::RetrievalFailed | UpstreamFailure::GenerationFailed => {
                StatusCode::BAD_GATEWAY
            }
        },
        ChatError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response<T>(error: &ChatError) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        error_status(error),
        Json(ApiResponse::error(
            error.code().to_string(),
            error.to_string(),
            None,
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&ChatError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&ChatError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_status(&ChatError::upstream(UpstreamFailure::RetrievalTimeout, "slow")),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            error_status(&ChatError::Persistence("db".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
