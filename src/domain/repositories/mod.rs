pub mod chat_message_repository;
pub mod chat_session_repository;
pub mod feedback_repository;

pub use chat_message_repository::ChatMessageRepository;
pub use chat_session_repository::ChatSessionRepository;
pub use feedback_repository::FeedbackRepository;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
