use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::domain::value_objects::MessageSource;

/// Server-side events of a turn, in the order the client must observe them.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    RetrievalStarted {
        session_id: Uuid,
        query: String,
        rephrased_query: Option<String>,
    },
    RetrievalCompleted {
        session_id: Uuid,
        sources: Vec<MessageSource>,
    },
    Token {
        session_id: Uuid,
        token: String,
    },
    GenerationCompleted {
        session_id: Uuid,
        message_id: Uuid,
        token_count: i32,
    },
    Error {
        session_id: Option<Uuid>,
        code: String,
        message: String,
    },
}

impl ChatEvent {
    pub fn error(session_id: Option<Uuid>, error: &ChatError) -> Self {
        ChatEvent::Error {
            session_id,
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            ChatEvent::RetrievalStarted { session_id, .. }
            | ChatEvent::RetrievalCompleted { session_id, .. }
            | ChatEvent::Token { session_id, .. }
            | ChatEvent::GenerationCompleted { session_id, .. } => Some(*session_id),
            ChatEvent::Error { session_id, .. } => *session_id,
        }
    }
}

/// Delivers a turn's events to the connection that started it.
///
/// Never waits on the client. When the connection's bounded queue is full the event is
/// dropped, and once the connection is gone every further event is discarded. The turn
/// itself always runs to completion; a client that fell behind refetches the session.
pub struct EventSink {
    tx: mpsc::Sender<ChatEvent>,
    detached: bool,
    dropped: u64,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<ChatEvent>) -> Self {
        Self {
            tx,
            detached: false,
            dropped: 0,
        }
    }

    pub fn emit(&mut self, event: ChatEvent) {
        if self.detached {
            return;
        }
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                if self.dropped == 0 {
                    warn!(
                        session_id = ?event.session_id(),
                        "outbound queue full, dropping turn events"
                    );
                }
                self.dropped += 1;
            }
            Err(TrySendError::Closed(_)) => {
                debug!("connection closed, discarding remaining turn events");
                self.detached = true;
            }
        }
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
