use axum::{Router, middleware};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::application::ports::identity_provider::IdentityProvider;
use crate::presentation::http::{
    auth::require_auth,
    handlers::{ChatSessionHandler, FeedbackHandler},
    routes::{chat_routes, feedback_routes, health_routes},
};
use crate::presentation::ws::{ChatGateway, ws_routes};

pub struct HttpServer {
    chat_session_handler: Arc<ChatSessionHandler>,
    feedback_handler: Arc<FeedbackHandler>,
    chat_gateway: Arc<ChatGateway>,
    identity_provider: Arc<dyn IdentityProvider>,
    port: u16,
}

impl HttpServer {
    pub fn new(
        chat_session_handler: Arc<ChatSessionHandler>,
        feedback_handler: Arc<FeedbackHandler>,
        chat_gateway: Arc<ChatGateway>,
        identity_provider: Arc<dyn IdentityProvider>,
        port: Option<u16>,
    ) -> Self {
        Self {
            chat_session_handler,
            feedback_handler,
            chat_gateway,
            identity_provider,
            port: port.unwrap_or(3000),
        }
    }

    /// REST routes sit behind bearer auth; the socket route authenticates its own upgrade.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let api = Router::new()
            .merge(chat_routes(self.chat_session_handler.clone()))
            .merge(feedback_routes(self.feedback_handler.clone()))
            .route_layer(middleware::from_fn_with_state(
                self.identity_provider.clone(),
                require_auth,
            ));

        Router::new()
            .merge(health_routes(self.chat_gateway.turn_service()))
            .merge(api)
            .merge(ws_routes(self.chat_gateway.clone()))
            .layer(cors)
            .layer(RequestBodyLimitLayer::new(1024 * 1024)) // 1MB cap
            .layer(
                TraceLayer::new_for_http()
                    .on_request(
                        |request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {
                            tracing::info!(
                                "Received request: {} {}",
                                request.method(),
                                request.uri().path()
                            );
                        },
                    )
                    .on_response(
                        |response: &axum::http::Response<axum::body::Body>,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::info!(
                                "Response: {} (took {} ms)",
                                response.status(),
                                latency.as_millis()
                            );
                        },
                    )
                    .on_failure(
                        |error: ServerErrorsFailureClass,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::error!(
                                "Request failed: {:?} (took {} ms)",
                                error,
                                latency.as_millis()
                            );
                        },
                    ),
            )
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        tracing::info!("EchoMind chat listening on {}", addr);
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
