use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::presentation::http::handlers::FeedbackHandler;

pub fn feedback_routes(feedback_handler: Arc<FeedbackHandler>) -> Router {
    Router::new()
        .route(
            "/chat/messages/{message_id}/feedback",
            post(FeedbackHandler::submit_feedback),
        )
        .route(
            "/chat/messages/{message_id}/sources",
            get(FeedbackHandler::get_sources),
        )
        .with_state(feedback_handler)
}
