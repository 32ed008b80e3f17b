//! JSON frames exchanged over the chat socket.
//!
//! Every frame is an object tagged by `"type"`. Server events always carry the
//! `session_id` they belong to so a client can demultiplex concurrent turns.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::application::services::chat_events::ChatEvent;
use crate::domain::value_objects::MessageSource;
use crate::presentation::http::dto::ChatModeDto;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "WsChatStart")]
    ChatStart {
        #[serde(default)]
        session_id: Option<Uuid>,
        query: String,
        #[serde(default)]
        mode: ChatModeDto,
        #[serde(default)]
        parent_message_id: Option<Uuid>,
        #[serde(default)]
        filters: HashMap<String, String>,
    },
    #[serde(rename = "WsChatCancel")]
    ChatCancel { session_id: Uuid },
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<Self, ChatError> {
        serde_json::from_str(text)
            .map_err(|e| ChatError::Validation(format!("Malformed command: {}", e)))
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            ClientCommand::ChatStart { session_id, .. } => *session_id,
            ClientCommand::ChatCancel { session_id } => Some(*session_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "WsConnected")]
    Connected { connection_id: Uuid },
    #[serde(rename = "WsRetrievalStart")]
    RetrievalStart {
        session_id: Uuid,
        query: String,
        rephrased_query: Option<String>,
    },
    #[serde(rename = "WsRetrievalComplete")]
    RetrievalComplete {
        session_id: Uuid,
        sources: Vec<MessageSource>,
    },
    #[serde(rename = "WsGenerationToken")]
    GenerationToken { session_id: Uuid, token: String },
    #[serde(rename = "WsGenerationComplete")]
    GenerationComplete {
        session_id: Uuid,
        message_id: Uuid,
        token_count: i32,
    },
    #[serde(rename = "WsError")]
    Error {
        session_id: Option<Uuid>,
        code: String,
        message: String,
    },
}

impl From<ChatEvent> for ServerEvent {
    fn from(event: ChatEvent) -> Self {
        match event {
            ChatEvent::RetrievalStarted {
                session_id,
                query,
                rephrased_query,
            } => ServerEvent::RetrievalStart {
                session_id,
                query,
                rephrased_query,
            },
            ChatEvent::RetrievalCompleted {
                session_id,
                sources,
            } => ServerEvent::RetrievalComplete {
                session_id,
                sources,
            },
            ChatEvent::Token { session_id, token } => {
                ServerEvent::GenerationToken { session_id, token }
            }
            ChatEvent::GenerationCompleted {
                session_id,
                message_id,
                token_count,
            } => ServerEvent::GenerationComplete {
                session_id,
                message_id,
                token_count,
            },
            ChatEvent::Error {
                session_id,
                code,
                message,
            } => ServerEvent::Error {
                session_id,
                code,
                message,
            },
        }
    }
}
