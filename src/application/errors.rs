use crate::domain::repositories::RepositoryError;

/// Why an upstream collaborator ended a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailure {
    RetrievalTimeout,
    RetrievalFailed,
    GenerationTimeout,
    GenerationFailed,
}

impl UpstreamFailure {
    pub fn code(&self) -> &'static str {
        match self {
            UpstreamFailure::RetrievalTimeout => "retrieval_timeout",
            UpstreamFailure::RetrievalFailed => "retrieval_failed",
            UpstreamFailure::GenerationTimeout => "generation_timeout",
            UpstreamFailure::GenerationFailed => "generation_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Upstream {
        failure: UpstreamFailure,
        message: String,
    },
    #[error("turn cancelled by user")]
    Cancelled,
    #[error("{0}")]
    Persistence(String),
}

impl ChatError {
    pub fn upstream(failure: UpstreamFailure, message: impl Into<String>) -> Self {
        ChatError::Upstream {
            failure,
            message: message.into(),
        }
    }

    /// Stable identifier carried by `WsError.code`.
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "bad_request",
            ChatError::NotFound(_) => "not_found",
            ChatError::Conflict(_) => "conflict",
            ChatError::Upstream { failure, .. } => failure.code(),
            ChatError::Cancelled => "cancelled",
            ChatError::Persistence(_) => "persistence_failed",
        }
    }
}

impl From<RepositoryError> for ChatError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(msg) => ChatError::NotFound(msg),
            RepositoryError::ValidationError(msg) => ChatError::Validation(msg),
            RepositoryError::DatabaseError(msg) => ChatError::Persistence(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ChatError::Validation("x".into()).code(), "bad_request");
        assert_eq!(ChatError::Conflict("turn in progress".into()).code(), "conflict");
        assert_eq!(ChatError::Cancelled.code(), "cancelled");
        assert_eq!(
            ChatError::upstream(UpstreamFailure::RetrievalTimeout, "slow").code(),
            "retrieval_timeout"
        );
        assert_eq!(ChatError::Persistence("disk".into()).code(), "persistence_failed");
    }

    #[test]
    fn test_repository_errors_map_to_taxonomy() {
        let err: ChatError = RepositoryError::DatabaseError("boom".into()).into();
        assert_eq!(err.code(), "persistence_failed");

        let err: ChatError = RepositoryError::NotFound("session".into()).into();
        assert_eq!(err.code(), "not_found");
    }
}
