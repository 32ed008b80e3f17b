pub mod chat_dto;
pub mod feedback_dto;
pub mod response_dto;

pub use chat_dto::*;
pub use feedback_dto::*;
pub use response_dto::*;
