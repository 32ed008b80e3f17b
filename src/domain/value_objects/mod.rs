pub mod chat_mode;
pub mod message_source;
pub mod retrieval_context;
pub mod turn_state;

pub use chat_mode::{ChatMode, MessageRole};
pub use message_source::{MessageSource, rank_sources};
pub use retrieval_context::{RetrievalContext, ToolCall};
pub use turn_state::TurnState;
