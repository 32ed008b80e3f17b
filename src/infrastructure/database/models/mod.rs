pub mod chat_message_model;
pub mod chat_session_model;
pub mod feedback_model;

pub use chat_message_model::*;
pub use chat_session_model::*;
pub use feedback_model::*;
