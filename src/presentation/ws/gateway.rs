use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::application::ports::identity_provider::{IdentityError, IdentityProvider};
use crate::application::services::chat_events::ChatEvent;
use crate::application::services::chat_turn_service::{ChatTurnService, StartTurnRequest};
use crate::presentation::http::auth::{AuthenticatedUser, authenticate};
use crate::presentation::ws::connection::ClientConnection;
use crate::presentation::ws::protocol::ClientCommand;

/// Dispatches client commands from any number of sockets onto the turn service.
pub struct ChatGateway {
    turn_service: Arc<ChatTurnService>,
    identity: Arc<dyn IdentityProvider>,
    outbound_buffer: usize,
}

impl ChatGateway {
    pub fn new(
        turn_service: Arc<ChatTurnService>,
        identity: Arc<dyn IdentityProvider>,
        outbound_buffer: usize,
    ) -> Self {
        Self {
            turn_service,
            identity,
            outbound_buffer: outbound_buffer.max(1),
        }
    }

    pub fn outbound_buffer(&self) -> usize {
        self.outbound_buffer
    }

    pub fn turn_service(&self) -> Arc<ChatTurnService> {
        self.turn_service.clone()
    }

    pub async fn authenticate(
        &self,
        bearer: Option<&str>,
    ) -> Result<AuthenticatedUser, IdentityError> {
        authenticate(self.identity.as_ref(), bearer).await
    }

    /// Handles one inbound text frame. Failures are reported on the connection as
    /// `WsError` and never affect other sessions.
    pub async fn handle_text(&self, connection: &ClientConnection, text: &str) {
        let command = match ClientCommand::parse(text) {
            Ok(command) => command,
            Err(e) => {
                warn!(connection_id = %connection.id(), error = %e, "rejected malformed frame");
                self.reject(connection, None, &e);
                return;
            }
        };
        let session_id = command.session_id();

        match command {
            ClientCommand::ChatStart {
                session_id: requested_session,
                query,
                mode,
                parent_message_id,
                filters,
            } => {
                let request = StartTurnRequest {
                    user_id: connection.user_id(),
                    session_id: requested_session,
                    query,
                    mode: mode.into_domain(),
                    parent_message_id,
                    filters,
                };

                match self
                    .turn_service
                    .start_turn(request, connection.events().clone())
                    .await
                {
                    Ok(handle) => {
                        debug!(
                            connection_id = %connection.id(),
                            session_id = %handle.session_id,
                            turn_id = %handle.turn_id,
                            "turn accepted"
                        );
                    }
                    Err(e) => {
                        info!(connection_id = %connection.id(), code = e.code(), "turn rejected");
                        self.reject(connection, session_id, &e);
                    }
                }
            }
            ClientCommand::ChatCancel { session_id: target } => {
                if let Err(e) = self
                    .turn_service
                    .cancel_turn(connection.user_id(), target)
                    .await
                {
                    self.reject(connection, session_id, &e);
                }
            }
        }
    }

    fn reject(&self, connection: &ClientConnection, session_id: Option<Uuid>, error: &ChatError) {
        match connection.events().try_send(ChatEvent::error(session_id, error)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(
                    connection_id = %connection.id(),
                    code = error.code(),
                    "outbound queue full, error dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                debug!(connection_id = %connection.id(), "connection closed before error delivery");
            }
        }
    }
}
