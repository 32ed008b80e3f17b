use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::ChatMode;

const MAX_TITLE_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    id: Uuid,
    user_id: Uuid,
    assistant_id: Option<Uuid>,
    title: String,
    mode: ChatMode,
    message_count: i32,
    creation_date: DateTime<Utc>,
    last_update: DateTime<Utc>,
    last_message_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    pub fn new(user_id: Uuid, assistant_id: Option<Uuid>, title: String, mode: ChatMode) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            assistant_id,
            title: normalize_title(&title),
            mode,
            message_count: 0,
            creation_date: now,
            last_update: now,
            last_message_at: None,
        }
    }

    /// Session opened implicitly by the first query of a conversation.
    pub fn from_first_query(user_id: Uuid, query: &str, mode: ChatMode) -> Self {
        Self::new(user_id, None, query.to_string(), mode)
    }

    /// Create a ChatSession from database values (for repository reconstruction)
    pub fn from_database(
        id: Uuid,
        user_id: Uuid,
        assistant_id: Option<Uuid>,
        title: String,
        mode: ChatMode,
        message_count: i32,
        creation_date: DateTime<Utc>,
        last_update: DateTime<Utc>,
        last_message_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            user_id,
            assistant_id,
            title,
            mode,
            message_count,
            creation_date,
            last_update,
            last_message_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn assistant_id(&self) -> Option<Uuid> {
        self.assistant_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn message_count(&self) -> i32 {
        self.message_count
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Bookkeeping applied in the same transaction that inserts the messages.
    pub fn record_messages(&mut self, count: i32, at: DateTime<Utc>) {
        self.message_count += count;
        self.last_message_at = Some(at);
        self.last_update = at;
    }
}

fn normalize_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "New chat".to_string();
    }

    if collapsed.chars().count() <= MAX_TITLE_CHARS {
        collapsed
    } else {
        let truncated: String = collapsed.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{}...", truncated.trim_end())
    }
}
