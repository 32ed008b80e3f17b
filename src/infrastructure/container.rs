use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::{
    application::{
        ports::{GenerationProvider, IdentityProvider, RetrievalProvider},
        services::{ChatTurnService, GenerationCoordinator, RetrievalCoordinator},
        use_cases::{
            CreateChatSessionUseCase, GetChatSessionUseCase, GetMessageSourcesUseCase,
            ListChatSessionsUseCase, ListMessagesUseCase, SubmitFeedbackUseCase,
        },
    },
    domain::repositories::{ChatMessageRepository, ChatSessionRepository, FeedbackRepository},
    infrastructure::{
        config::AppConfig,
        database::{
            create_connection_pool,
            repositories::{
                PostgresChatMessageRepository, PostgresChatSessionRepository,
                PostgresFeedbackRepository,
            },
            run_migrations,
        },
        external_services::{
            GenerationClientConfig, HttpGenerationProvider, HttpRetrievalProvider,
            SearchClientConfig, StaticTokenIdentityProvider,
        },
        memory::InMemoryChatStore,
    },
    presentation::{
        http::{
            handlers::{ChatSessionHandler, FeedbackHandler},
            server::HttpServer,
        },
        ws::ChatGateway,
    },
};

const GENERATION_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HISTORY_LIMIT: i64 = 20;

/// The three stores a deployment runs against.
pub struct Repositories {
    pub sessions: Arc<dyn ChatSessionRepository>,
    pub messages: Arc<dyn ChatMessageRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = InMemoryChatStore::new();
        Self {
            sessions: Arc::new(store.clone()),
            messages: Arc::new(store.clone()),
            feedback: Arc::new(store),
        }
    }
}

pub struct AppContainer {
    pub port: u16,

    // Repositories
    pub session_repository: Arc<dyn ChatSessionRepository>,
    pub message_repository: Arc<dyn ChatMessageRepository>,
    pub feedback_repository: Arc<dyn FeedbackRepository>,

    // External Services
    pub identity_provider: Arc<dyn IdentityProvider>,

    // Application Services
    pub turn_service: Arc<ChatTurnService>,

    // HTTP Handlers
    pub chat_session_handler: Arc<ChatSessionHandler>,
    pub feedback_handler: Arc<FeedbackHandler>,

    // WebSocket
    pub chat_gateway: Arc<ChatGateway>,
}

impl AppContainer {
    pub async fn new(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let repositories = match config.database_url.as_deref() {
            Some(database_url) => {
                let db_pool = create_connection_pool(database_url, config.database_pool_size)?;
                run_migrations(&db_pool)
                    .map_err(|e| format!("Failed to run database migrations: {}", e))?;
                info!("Using Postgres chat store");

                Repositories {
                    sessions: Arc::new(PostgresChatSessionRepository::new(db_pool.clone())),
                    messages: Arc::new(PostgresChatMessageRepository::new(db_pool.clone())),
                    feedback: Arc::new(PostgresFeedbackRepository::new(db_pool)),
                }
            }
            None => {
                warn!("DATABASE_URL not set, chat history is kept in memory and lost on restart");
                Repositories::in_memory()
            }
        };

        let retrieval_provider: Arc<dyn RetrievalProvider> =
            Arc::new(HttpRetrievalProvider::new(SearchClientConfig::new(
                config.search_service_url.clone(),
                config.http_max_retries,
                config.retrieval_timeout,
            ))?);
        let generation_provider: Arc<dyn GenerationProvider> =
            Arc::new(HttpGenerationProvider::new(GenerationClientConfig {
                service_url: config.generation_service_url.clone(),
                connect_timeout: GENERATION_CONNECT_TIMEOUT,
            })?);
        let identity_provider: Arc<dyn IdentityProvider> = Arc::new(
            StaticTokenIdentityProvider::new(config.auth_tokens.clone()),
        );
        if config.auth_tokens.is_empty() {
            warn!("AUTH_TOKENS is empty, every request will be rejected");
        }

        Ok(Self::from_parts(
            config,
            repositories,
            retrieval_provider,
            generation_provider,
            identity_provider,
        ))
    }

    pub fn from_parts(
        config: &AppConfig,
        repositories: Repositories,
        retrieval_provider: Arc<dyn RetrievalProvider>,
        generation_provider: Arc<dyn GenerationProvider>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let Repositories {
            sessions: session_repository,
            messages: message_repository,
            feedback: feedback_repository,
        } = repositories;

        // Create application services
        let retrieval_coordinator = Arc::new(RetrievalCoordinator::new(
            retrieval_provider,
            config.retrieval_timeout,
            config.retrieval_top_k,
        ));
        let generation_coordinator = Arc::new(GenerationCoordinator::new(
            generation_provider,
            config.token_timeout,
        ));
        let turn_service = Arc::new(
            ChatTurnService::new(
                session_repository.clone(),
                message_repository.clone(),
                retrieval_coordinator,
                generation_coordinator,
            )
            .with_history_limit(HISTORY_LIMIT),
        );

        // Create use cases
        let create_session_use_case =
            Arc::new(CreateChatSessionUseCase::new(session_repository.clone()));
        let list_sessions_use_case =
            Arc::new(ListChatSessionsUseCase::new(session_repository.clone()));
        let get_session_use_case = Arc::new(GetChatSessionUseCase::new(
            session_repository.clone(),
            message_repository.clone(),
        ));
        let list_messages_use_case = Arc::new(ListMessagesUseCase::new(
            session_repository.clone(),
            message_repository.clone(),
        ));
        let submit_feedback_use_case = Arc::new(SubmitFeedbackUseCase::new(
            session_repository.clone(),
            message_repository.clone(),
            feedback_repository.clone(),
        ));
        let message_sources_use_case = Arc::new(GetMessageSourcesUseCase::new(
            session_repository.clone(),
            message_repository.clone(),
        ));

        // Create handlers
        let chat_session_handler = Arc::new(ChatSessionHandler::new(
            create_session_use_case,
            list_sessions_use_case,
            get_session_use_case,
            list_messages_use_case,
        ));
        let feedback_handler = Arc::new(FeedbackHandler::new(
            submit_feedback_use_case,
            message_sources_use_case,
        ));
        let chat_gateway = Arc::new(ChatGateway::new(
            turn_service.clone(),
            identity_provider.clone(),
            config.ws_outbound_buffer,
        ));

        Self {
            port: config.port,
            session_repository,
            message_repository,
            feedback_repository,
            identity_provider,
            turn_service,
            chat_session_handler,
            feedback_handler,
            chat_gateway,
        }
    }

    pub fn http_server(&self) -> HttpServer {
        HttpServer::new(
            self.chat_session_handler.clone(),
            self.feedback_handler.clone(),
            self.chat_gateway.clone(),
            self.identity_provider.clone(),
            Some(self.port),
        )
    }
}
