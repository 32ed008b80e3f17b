//! Per-(session, turn) state machine.
//!
//! Every input a turn can observe is a [`TurnTrigger`]; [`TurnStateMachine::apply`]
//! owns the single transition table. Inputs that are not legal in the current state
//! are rejected and leave the state untouched.

use tracing::warn;
use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::application::services::retrieval_coordinator::RetrievedContext;
use crate::domain::value_objects::{ToolCall, TurnState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnTrigger {
    Start,
    DispatchRetrieval,
    RetrievalSucceeded,
    Token,
    ToolCall,
    GenerationFinished,
    Persisted,
    Cancel,
    Fail,
    Reset,
}

/// Reports delivered to the turn driver through its per-session queue.
#[derive(Debug)]
pub enum TurnSignal {
    RetrievalSucceeded(RetrievedContext),
    RetrievalFailed(ChatError),
    Token(String),
    ToolCall(ToolCall),
    GenerationFinished,
    GenerationFailed(ChatError),
}

impl TurnSignal {
    pub fn trigger(&self) -> TurnTrigger {
        match self {
            TurnSignal::RetrievalSucceeded(_) => TurnTrigger::RetrievalSucceeded,
            TurnSignal::RetrievalFailed(_) | TurnSignal::GenerationFailed(_) => TurnTrigger::Fail,
            TurnSignal::Token(_) => TurnTrigger::Token,
            TurnSignal::ToolCall(_) => TurnTrigger::ToolCall,
            TurnSignal::GenerationFinished => TurnTrigger::GenerationFinished,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal transition: {trigger:?} while {from}")]
pub struct IllegalTransition {
    pub from: TurnState,
    pub trigger: TurnTrigger,
}

#[derive(Debug)]
pub struct TurnStateMachine {
    session_id: Uuid,
    turn_id: Uuid,
    state: TurnState,
}

impl TurnStateMachine {
    pub fn new(session_id: Uuid, turn_id: Uuid) -> Self {
        Self {
            session_id,
            turn_id,
            state: TurnState::Idle,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn turn_id(&self) -> Uuid {
        self.turn_id
    }

    pub fn next_state(from: TurnState, trigger: TurnTrigger) -> Option<TurnState> {
        use TurnState::*;
        use TurnTrigger as T;

        match (from, trigger) {
            (state, T::Start) if state.is_idle() => Some(RetrievalPending),
            (RetrievalPending, T::DispatchRetrieval) => Some(Retrieving),
            (Retrieving, T::RetrievalSucceeded) => Some(Generating),
            (Generating, T::Token | T::ToolCall) => Some(Generating),
            // Completion is only reached once the persistence write has landed.
            (Generating, T::GenerationFinished) => Some(Generating),
            (Generating, T::Persisted) => Some(Completed),
            (state, T::Cancel) if state.is_cancellable() => Some(Cancelled),
            (state, T::Fail) if state.is_cancellable() => Some(Failed),
            (state, T::Reset) if state.is_terminal() => Some(Idle),
            _ => None,
        }
    }

    pub fn apply(&mut self, trigger: TurnTrigger) -> Result<TurnState, IllegalTransition> {
        match Self::next_state(self.state, trigger) {
            Some(next) => {
                self.state = next;
                Ok(next)
            }
            None => {
                let rejected = IllegalTransition {
                    from: self.state,
                    trigger,
                };
                warn!(
                    session_id = %self.session_id,
                    turn_id = %self.turn_id,
                    state = %self.state,
                    ?trigger,
                    "rejected illegal turn transition"
                );
                Err(rejected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> TurnStateMachine {
        TurnStateMachine::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_happy_path() {
        let mut m = machine();
        assert_eq!(m.apply(TurnTrigger::Start).unwrap(), TurnState::RetrievalPending);
        assert_eq!(m.apply(TurnTrigger::DispatchRetrieval).unwrap(), TurnState::Retrieving);
        assert_eq!(m.apply(TurnTrigger::RetrievalSucceeded).unwrap(), TurnState::Generating);
        assert_eq!(m.apply(TurnTrigger::Token).unwrap(), TurnState::Generating);
        assert_eq!(m.apply(TurnTrigger::Token).unwrap(), TurnState::Generating);
        assert_eq!(m.apply(TurnTrigger::GenerationFinished).unwrap(), TurnState::Generating);
        assert_eq!(m.apply(TurnTrigger::Persisted).unwrap(), TurnState::Completed);
        assert_eq!(m.apply(TurnTrigger::Reset).unwrap(), TurnState::Idle);
    }

    #[test]
    fn test_token_after_cancel_is_rejected() {
        let mut m = machine();
        m.apply(TurnTrigger::Start).unwrap();
        m.apply(TurnTrigger::DispatchRetrieval).unwrap();
        m.apply(TurnTrigger::RetrievalSucceeded).unwrap();
        m.apply(TurnTrigger::Cancel).unwrap();

        let err = m.apply(TurnTrigger::Token).unwrap_err();
        assert_eq!(err.from, TurnState::Cancelled);
        assert_eq!(m.state(), TurnState::Cancelled);

        assert!(m.apply(TurnTrigger::Persisted).is_err());
        assert_eq!(m.apply(TurnTrigger::Reset).unwrap(), TurnState::Idle);
    }

    #[test]
    fn test_generation_never_follows_failed_retrieval() {
        let mut m = machine();
        m.apply(TurnTrigger::Start).unwrap();
        m.apply(TurnTrigger::DispatchRetrieval).unwrap();
        assert_eq!(m.apply(TurnTrigger::Fail).unwrap(), TurnState::Failed);

        assert!(m.apply(TurnTrigger::RetrievalSucceeded).is_err());
        assert!(m.apply(TurnTrigger::Token).is_err());
        assert_eq!(m.state(), TurnState::Failed);
    }

    #[test]
    fn test_tokens_rejected_before_retrieval_completes() {
        let mut m = machine();
        m.apply(TurnTrigger::Start).unwrap();
        m.apply(TurnTrigger::DispatchRetrieval).unwrap();
        assert!(m.apply(TurnTrigger::Token).is_err());
        assert_eq!(m.state(), TurnState::Retrieving);
    }

    #[test]
    fn test_idle_accepts_only_start() {
        let triggers = [
            TurnTrigger::DispatchRetrieval,
            TurnTrigger::RetrievalSucceeded,
            TurnTrigger::Token,
            TurnTrigger::ToolCall,
            TurnTrigger::GenerationFinished,
            TurnTrigger::Persisted,
            TurnTrigger::Cancel,
            TurnTrigger::Fail,
            TurnTrigger::Reset,
        ];
        for trigger in triggers {
            assert!(TurnStateMachine::next_state(TurnState::Idle, trigger).is_none());
        }
    }

    #[test]
    fn test_second_start_is_rejected_while_active() {
        let mut m = machine();
        m.apply(TurnTrigger::Start).unwrap();
        assert!(m.apply(TurnTrigger::Start).is_err());
        assert_eq!(m.state(), TurnState::RetrievalPending);
    }

    #[test]
    fn test_signal_triggers() {
        assert_eq!(TurnSignal::Token("a".into()).trigger(), TurnTrigger::Token);
        assert_eq!(
            TurnSignal::RetrievalFailed(ChatError::Cancelled).trigger(),
            TurnTrigger::Fail
        );
        assert_eq!(
            TurnSignal::GenerationFinished.trigger(),
            TurnTrigger::GenerationFinished
        );
    }
}
