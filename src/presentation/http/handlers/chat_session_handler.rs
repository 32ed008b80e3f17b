use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::use_cases::{
    CreateChatSessionRequest, CreateChatSessionUseCase, GetChatSessionRequest,
    GetChatSessionUseCase, ListChatSessionsRequest, ListChatSessionsUseCase, ListMessagesRequest,
    ListMessagesUseCase,
};
use crate::presentation::http::auth::AuthenticatedUser;
use crate::presentation::http::dto::{
    ApiResponse, ChatMessageListDto, ChatSessionDetailDto, ChatSessionDto, ChatSessionListDto,
    CreateChatSessionRequestDto, PaginationDto,
};
use crate::presentation::http::handlers::error_response;

pub struct ChatSessionHandler {
    create_session_use_case: Arc<CreateChatSessionUseCase>,
    list_sessions_use_case: Arc<ListChatSessionsUseCase>,
    get_session_use_case: Arc<GetChatSessionUseCase>,
    list_messages_use_case: Arc<ListMessagesUseCase>,
}

impl ChatSessionHandler {
    pub fn new(
        create_session_use_case: Arc<CreateChatSessionUseCase>,
        list_sessions_use_case: Arc<ListChatSessionsUseCase>,
        get_session_use_case: Arc<GetChatSessionUseCase>,
        list_messages_use_case: Arc<ListMessagesUseCase>,
    ) -> Self {
        Self {
            create_session_use_case,
            list_sessions_use_case,
            get_session_use_case,
            list_messages_use_case,
        }
    }

    pub async fn create_session(
        State(handler): State<Arc<ChatSessionHandler>>,
        Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
        Json(body): Json<CreateChatSessionRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = CreateChatSessionRequest {
            user_id,
            assistant_id: body.assistant_id,
            title: body.title,
            mode: body.mode.into_domain(),
        };

        match handler.create_session_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::CREATED,
                Json(ApiResponse::success(ChatSessionDto::from(&response.session))),
            )),
            Err(e) => Ok(error_response(&e)),
        }
    }

    pub async fn list_sessions(
        State(handler): State<Arc<ChatSessionHandler>>,
        Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
        Query(pagination): Query<PaginationDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = ListChatSessionsRequest {
            user_id,
            skip: pagination.skip,
            limit: pagination.limit,
        };

        match handler.list_sessions_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(ChatSessionListDto::from(response))),
            )),
            Err(e) => Ok(error_response(&e)),
        }
    }

    pub async fn get_session(
        State(handler): State<Arc<ChatSessionHandler>>,
        Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
        Path(session_id): Path<Uuid>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = GetChatSessionRequest {
            user_id,
            session_id,
        };

        match handler.get_session_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(ChatSessionDetailDto::from(response))),
            )),
            Err(e) => Ok(error_response(&e)),
        }
    }

    pub async fn list_messages(
        State(handler): State<Arc<ChatSessionHandler>>,
        Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
        Path(session_id): Path<Uuid>,
        Query(pagination): Query<PaginationDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = ListMessagesRequest {
            user_id,
            session_id,
            skip: pagination.skip,
            limit: pagination.limit,
        };

        match handler.list_messages_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(ChatMessageListDto::from(response))),
            )),
            Err(e) => Ok(error_response(&e)),
        }
    }
}
