use axum::{Router, routing::get};
use std::sync::Arc;

use crate::presentation::http::handlers::ChatSessionHandler;

pub fn chat_routes(chat_session_handler: Arc<ChatSessionHandler>) -> Router {
    Router::new()
        .route(
            "/chat/sessions",
            get(ChatSessionHandler::list_sessions).post(ChatSessionHandler::create_session),
        )
        .route("/chat/sessions/{session_id}", get(ChatSessionHandler::get_session))
        .route(
            "/chat/sessions/{session_id}/messages",
            get(ChatSessionHandler::list_messages),
        )
        .with_state(chat_session_handler)
}
