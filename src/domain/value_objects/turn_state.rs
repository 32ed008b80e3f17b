use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    Idle,
    RetrievalPending,
    Retrieving,
    Generating,
    Completed,
    Cancelled,
    Failed,
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }

    /// Completed, Cancelled and Failed end a turn; the session then returns to Idle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::Completed | TurnState::Cancelled | TurnState::Failed
        )
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            TurnState::RetrievalPending | TurnState::Retrieving | TurnState::Generating
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::RetrievalPending => "retrieval_pending",
            TurnState::Retrieving => "retrieving",
            TurnState::Generating => "generating",
            TurnState::Completed => "completed",
            TurnState::Cancelled => "cancelled",
            TurnState::Failed => "failed",
        }
    }
}

impl Default for TurnState {
    fn default() -> Self {
        TurnState::Idle
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
