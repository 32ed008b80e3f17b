pub mod chat_message;
pub mod chat_session;
pub mod message_feedback;

pub use chat_message::{AssistantReply, ChatMessage};
pub use chat_session::ChatSession;
pub use message_feedback::MessageFeedback;
