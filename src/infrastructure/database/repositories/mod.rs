pub mod postgres_chat_message_repository;
pub mod postgres_chat_session_repository;
pub mod postgres_feedback_repository;

pub use postgres_chat_message_repository::PostgresChatMessageRepository;
pub use postgres_chat_session_repository::PostgresChatSessionRepository;
pub use postgres_feedback_repository::PostgresFeedbackRepository;

use crate::domain::repositories::RepositoryError;

pub(crate) fn join_error(e: tokio::task::JoinError) -> RepositoryError {
    RepositoryError::DatabaseError(format!("Task join error: {}", e))
}
