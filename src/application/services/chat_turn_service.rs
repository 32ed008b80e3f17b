use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::application::ports::generation_provider::{GenerationRequest, HistoryEntry};
use crate::application::services::chat_events::{ChatEvent, EventSink};
use crate::application::services::generation_coordinator::GenerationCoordinator;
use crate::application::services::retrieval_coordinator::{RetrievalCoordinator, RetrievedContext};
use crate::application::services::turn_state_machine::{TurnSignal, TurnStateMachine, TurnTrigger};
use crate::domain::entities::{AssistantReply, ChatMessage, ChatSession};
use crate::domain::repositories::{ChatMessageRepository, ChatSessionRepository};
use crate::domain::value_objects::{ChatMode, ToolCall};

const MAX_QUERY_CHARS: usize = 8000;
const SIGNAL_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct StartTurnRequest {
    pub user_id: Uuid,
    pub session_id: Option<Uuid>,
    pub query: String,
    pub mode: Option<ChatMode>,
    pub parent_message_id: Option<Uuid>,
    pub filters: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed { message_id: Uuid, token_count: i32 },
    Cancelled,
    Failed { code: String },
}

pub struct TurnHandle {
    pub session_id: Uuid,
    pub turn_id: Uuid,
    join: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    pub async fn outcome(self) -> TurnOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(turn_id = %self.turn_id, error = %e, "turn task aborted");
                TurnOutcome::Failed {
                    code: "internal".to_string(),
                }
            }
        }
    }
}

struct ActiveTurn {
    turn_id: Uuid,
    cancel: CancellationToken,
}

type ActiveTurns = Arc<Mutex<HashMap<Uuid, ActiveTurn>>>;

/// Runs chat turns: one active turn per session, any number across sessions.
pub struct ChatTurnService {
    session_repository: Arc<dyn ChatSessionRepository>,
    message_repository: Arc<dyn ChatMessageRepository>,
    retrieval: Arc<RetrievalCoordinator>,
    generation: Arc<GenerationCoordinator>,
    active_turns: ActiveTurns,
    history_limit: i64,
}

impl ChatTurnService {
    pub fn new(
        session_repository: Arc<dyn ChatSessionRepository>,
        message_repository: Arc<dyn ChatMessageRepository>,
        retrieval: Arc<RetrievalCoordinator>,
        generation: Arc<GenerationCoordinator>,
    ) -> Self {
        Self {
            session_repository,
            message_repository,
            retrieval,
            generation,
            active_turns: Arc::new(Mutex::new(HashMap::new())),
            history_limit: 20,
        }
    }

    pub fn with_history_limit(mut self, limit: i64) -> Self {
        self.history_limit = limit.max(0);
        self
    }

    /// Validates the command, claims the session's turn slot and spawns the turn.
    ///
    /// Errors returned here leave no trace: no slot is held and nothing is persisted.
    #[instrument(skip_all, fields(user_id = %request.user_id))]
    pub async fn start_turn(
        &self,
        request: StartTurnRequest,
        events: mpsc::Sender<ChatEvent>,
    ) -> Result<TurnHandle, ChatError> {
        let query = request.query.trim().to_string();
        if query.is_empty() {
            return Err(ChatError::Validation("Query cannot be empty".to_string()));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(ChatError::Validation(format!(
                "Query cannot exceed {} characters",
                MAX_QUERY_CHARS
            )));
        }

        let session = match request.session_id {
            Some(session_id) => self.owned_session(request.user_id, session_id).await?,
            None => {
                if request.parent_message_id.is_some() {
                    return Err(ChatError::Validation(
                        "parent_message_id requires an existing session".to_string(),
                    ));
                }
                let session = ChatSession::from_first_query(
                    request.user_id,
                    &query,
                    request.mode.unwrap_or_default(),
                );
                self.session_repository.save(&session).await?;
                info!(session_id = %session.id(), "chat session opened by first query");
                session
            }
        };

        let parent_message_id = self
            .resolve_parent(session.id(), request.parent_message_id)
            .await?;

        let turn_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        {
            let mut active = self.active_turns.lock().await;
            if active.contains_key(&session.id()) {
                return Err(ChatError::Conflict("turn in progress".to_string()));
            }
            active.insert(
                session.id(),
                ActiveTurn {
                    turn_id,
                    cancel: cancel.clone(),
                },
            );
        }

        let session_id = session.id();
        let mode = request.mode.unwrap_or(session.mode());
        let user_message = ChatMessage::new_user(session_id, query.clone(), parent_message_id);

        info!(%session_id, %turn_id, %mode, "turn accepted");

        let driver = TurnDriver {
            machine: TurnStateMachine::new(session_id, turn_id),
            session_id,
            user_id: request.user_id,
            query,
            mode,
            filters: request.filters,
            user_message,
            message_repository: self.message_repository.clone(),
            retrieval: self.retrieval.clone(),
            generation: self.generation.clone(),
            active_turns: self.active_turns.clone(),
            history_limit: self.history_limit,
            cancel,
            sink: EventSink::new(events),
        };
        let join = tokio::spawn(driver.run());

        Ok(TurnHandle {
            session_id,
            turn_id,
            join,
        })
    }

    /// Requests cancellation of the session's active turn.
    ///
    /// Returns `false` when the session is idle.
    #[instrument(skip(self))]
    pub async fn cancel_turn(&self, user_id: Uuid, session_id: Uuid) -> Result<bool, ChatError> {
        self.owned_session(user_id, session_id).await?;

        let active = self.active_turns.lock().await;
        match active.get(&session_id) {
            Some(turn) => {
                info!(%session_id, turn_id = %turn.turn_id, "cancellation requested");
                turn.cancel.cancel();
                Ok(true)
            }
            None => {
                debug!(%session_id, "cancel ignored, no active turn");
                Ok(false)
            }
        }
    }

    pub async fn active_turn(&self, session_id: Uuid) -> Option<Uuid> {
        self.active_turns
            .lock()
            .await
            .get(&session_id)
            .map(|turn| turn.turn_id)
    }

    pub async fn active_turn_count(&self) -> usize {
        self.active_turns.lock().await.len()
    }

    async fn owned_session(&self, user_id: Uuid, session_id: Uuid) -> Result<ChatSession, ChatError> {
        match self.session_repository.find_by_id(session_id).await? {
            Some(session) if session.is_owned_by(user_id) => Ok(session),
            _ => Err(ChatError::Validation(format!("Unknown session: {}", session_id))),
        }
    }

    async fn resolve_parent(
        &self,
        session_id: Uuid,
        requested: Option<Uuid>,
    ) -> Result<Option<Uuid>, ChatError> {
        match requested {
            Some(parent_id) => match self.message_repository.find_by_id(parent_id).await? {
                Some(parent) if parent.chat_session_id() == session_id => Ok(Some(parent_id)),
                _ => Err(ChatError::Validation(format!(
                    "Unknown parent message: {}",
                    parent_id
                ))),
            },
            None => Ok(self
                .message_repository
                .find_recent_by_session(session_id, 1)
                .await?
                .last()
                .map(ChatMessage::id)),
        }
    }
}

enum Terminal {
    Completed { message_id: Uuid, token_count: i32 },
    Cancelled,
    Failed(ChatError),
}

enum Next {
    Cancelled,
    Signal(TurnSignal),
    Closed,
}

/// Owns one turn from acceptance to the return to Idle.
struct TurnDriver {
    machine: TurnStateMachine,
    session_id: Uuid,
    user_id: Uuid,
    query: String,
    mode: ChatMode,
    filters: HashMap<String, String>,
    user_message: ChatMessage,
    message_repository: Arc<dyn ChatMessageRepository>,
    retrieval: Arc<RetrievalCoordinator>,
    generation: Arc<GenerationCoordinator>,
    active_turns: ActiveTurns,
    history_limit: i64,
    cancel: CancellationToken,
    sink: EventSink,
}

impl TurnDriver {
    #[instrument(skip_all, fields(session_id = %self.session_id, turn_id = %self.machine.turn_id()))]
    async fn run(mut self) -> TurnOutcome {
        let (signal_tx, mut signal_rx) = mpsc::channel::<TurnSignal>(SIGNAL_QUEUE_CAPACITY);
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        let _ = self.machine.apply(TurnTrigger::Start);
        tasks.push(self.spawn_retrieval(signal_tx.clone()));
        let _ = self.machine.apply(TurnTrigger::DispatchRetrieval);

        let mut retrieved: Option<RetrievedContext> = None;
        let mut tokens: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        let terminal = loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Next::Cancelled,
                signal = signal_rx.recv() => match signal {
                    Some(signal) => Next::Signal(signal),
                    None => Next::Closed,
                },
            };

            let signal = match next {
                Next::Cancelled => {
                    let _ = self.machine.apply(TurnTrigger::Cancel);
                    break Terminal::Cancelled;
                }
                Next::Closed => {
                    let _ = self.machine.apply(TurnTrigger::Fail);
                    break Terminal::Failed(ChatError::Persistence(
                        "turn workers stopped unexpectedly".to_string(),
                    ));
                }
                Next::Signal(signal) => signal,
            };

            if self.machine.apply(signal.trigger()).is_err() {
                continue;
            }

            match signal {
                TurnSignal::RetrievalSucceeded(context) => {
                    self.sink.emit(ChatEvent::RetrievalStarted {
                        session_id: self.session_id,
                        query: context.query.clone(),
                        rephrased_query: context.rephrased_query.clone(),
                    });
                    self.sink.emit(ChatEvent::RetrievalCompleted {
                        session_id: self.session_id,
                        sources: context.sources.clone(),
                    });
                    tasks.push(self.spawn_generation(&context, signal_tx.clone()));
                    retrieved = Some(context);
                }
                TurnSignal::Token(token) => {
                    self.sink.emit(ChatEvent::Token {
                        session_id: self.session_id,
                        token: token.clone(),
                    });
                    tokens.push(token);
                }
                TurnSignal::ToolCall(call) => tool_calls.push(call),
                TurnSignal::GenerationFinished => {
                    if self.cancel.is_cancelled() {
                        let _ = self.machine.apply(TurnTrigger::Cancel);
                        break Terminal::Cancelled;
                    }
                    let Some(context) = retrieved.take() else {
                        let _ = self.machine.apply(TurnTrigger::Fail);
                        break Terminal::Failed(ChatError::Persistence(
                            "generation finished without retrieval context".to_string(),
                        ));
                    };
                    match self
                        .persist(context, std::mem::take(&mut tokens), std::mem::take(&mut tool_calls))
                        .await
                    {
                        Ok((message_id, token_count)) => {
                            let _ = self.machine.apply(TurnTrigger::Persisted);
                            break Terminal::Completed {
                                message_id,
                                token_count,
                            };
                        }
                        Err(e) => {
                            let _ = self.machine.apply(TurnTrigger::Fail);
                            break Terminal::Failed(e);
                        }
                    }
                }
                TurnSignal::RetrievalFailed(e) | TurnSignal::GenerationFailed(e) => {
                    break Terminal::Failed(e);
                }
            }
        };

        // Stop whatever is still running for this turn.
        self.cancel.cancel();
        for task in &tasks {
            task.abort();
        }
        drop(signal_tx);
        while let Ok(late) = signal_rx.try_recv() {
            let _ = self.machine.apply(late.trigger());
        }

        let _ = self.machine.apply(TurnTrigger::Reset);
        self.release_slot().await;

        self.finish(terminal)
    }

    fn spawn_retrieval(&self, signals: mpsc::Sender<TurnSignal>) -> JoinHandle<()> {
        let retrieval = self.retrieval.clone();
        let query = self.query.clone();
        let user_id = self.user_id;
        let session_id = self.session_id;
        let mode = self.mode;
        let filters = self.filters.clone();

        tokio::spawn(async move {
            let signal = match retrieval
                .retrieve(&query, user_id, session_id, mode, filters)
                .await
            {
                Ok(context) => TurnSignal::RetrievalSucceeded(context),
                Err(e) => TurnSignal::RetrievalFailed(e),
            };
            let _ = signals.send(signal).await;
        })
    }

    fn spawn_generation(
        &self,
        context: &RetrievedContext,
        signals: mpsc::Sender<TurnSignal>,
    ) -> JoinHandle<()> {
        let generation = self.generation.clone();
        let repository = self.message_repository.clone();
        let cancel = self.cancel.clone();
        let session_id = self.session_id;
        let history_limit = self.history_limit;
        let query = context
            .rephrased_query
            .clone()
            .unwrap_or_else(|| self.query.clone());
        let sources = context.sources.clone();
        let mode = self.mode;

        tokio::spawn(async move {
            let history = if history_limit > 0 {
                match repository.find_recent_by_session(session_id, history_limit).await {
                    Ok(messages) => messages
                        .into_iter()
                        .map(|m| HistoryEntry {
                            role: m.role(),
                            content: m.content().to_string(),
                        })
                        .collect(),
                    Err(e) => {
                        let _ = signals
                            .send(TurnSignal::GenerationFailed(ChatError::Persistence(format!(
                                "Failed to load history: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                }
            } else {
                Vec::new()
            };

            let request = GenerationRequest {
                query,
                history,
                sources,
                mode,
            };
            generation.run(request, cancel, signals).await;
        })
    }

    async fn persist(
        &self,
        context: RetrievedContext,
        tokens: Vec<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Result<(Uuid, i32), ChatError> {
        let token_count = tokens.len() as i32;
        let reply = AssistantReply {
            content: tokens.concat(),
            token_count,
            rephrased_query: context.rephrased_query,
            sources: context.sources,
            tool_calls,
        };
        let assistant = ChatMessage::new_assistant(self.session_id, self.user_message.id(), reply);
        let message_id = assistant.id();

        self.message_repository
            .append_messages(self.session_id, &[self.user_message.clone(), assistant])
            .await
            .map_err(|e| ChatError::Persistence(format!("Failed to persist turn: {}", e)))?;

        Ok((message_id, token_count))
    }

    async fn release_slot(&self) {
        let mut active = self.active_turns.lock().await;
        let owned = active
            .get(&self.session_id)
            .is_some_and(|turn| turn.turn_id == self.machine.turn_id());
        if owned {
            active.remove(&self.session_id);
        }
    }

    fn finish(mut self, terminal: Terminal) -> TurnOutcome {
        let outcome = match terminal {
            Terminal::Completed {
                message_id,
                token_count,
            } => {
                info!(%message_id, token_count, "turn completed");
                self.sink.emit(ChatEvent::GenerationCompleted {
                    session_id: self.session_id,
                    message_id,
                    token_count,
                });
                TurnOutcome::Completed {
                    message_id,
                    token_count,
                }
            }
            Terminal::Cancelled => {
                info!("turn cancelled");
                self.sink.emit(ChatEvent::error(Some(self.session_id), &ChatError::Cancelled));
                TurnOutcome::Cancelled
            }
            Terminal::Failed(e) => {
                error!(code = e.code(), error = %e, "turn failed");
                self.sink.emit(ChatEvent::error(Some(self.session_id), &e));
                TurnOutcome::Failed {
                    code: e.code().to_string(),
                }
            }
        };
        if self.sink.is_detached() {
            debug!("connection gone before the turn ended");
        } else if self.sink.dropped() > 0 {
            warn!(dropped = self.sink.dropped(), "client fell behind, events were dropped");
        }
        outcome
    }
}
