use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};

use crate::application::services::ChatTurnService;
use crate::presentation::http::dto::{ApiResponse, HealthResponseDto};

/// Liveness plus the number of turns currently in flight. Served without auth.
pub fn health_routes(turn_service: Arc<ChatTurnService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(turn_service)
}

async fn health_handler(State(turn_service): State<Arc<ChatTurnService>>) -> impl IntoResponse {
    let health_response = HealthResponseDto {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_turns: turn_service.active_turn_count().await,
    };

    (StatusCode::OK, Json(ApiResponse::success(health_response)))
}
