pub mod connection;
pub mod gateway;
pub mod protocol;
pub mod session;

pub use gateway::ChatGateway;

use axum::{Router, routing::get};
use std::sync::Arc;

pub fn ws_routes(gateway: Arc<ChatGateway>) -> Router {
    Router::new()
        .route("/ws", get(session::ws_handler))
        .with_state(gateway)
}
