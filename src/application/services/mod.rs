pub mod chat_events;
pub mod chat_turn_service;
pub mod generation_coordinator;
pub mod retrieval_coordinator;
pub mod turn_state_machine;

pub use chat_turn_service::ChatTurnService;
pub use generation_coordinator::GenerationCoordinator;
pub use retrieval_coordinator::RetrievalCoordinator;
