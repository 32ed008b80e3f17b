use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::use_cases::{
    GetMessageSourcesRequest, GetMessageSourcesUseCase, SubmitFeedbackRequest,
    SubmitFeedbackUseCase,
};
use crate::presentation::http::auth::AuthenticatedUser;
use crate::presentation::http::dto::{
    ApiResponse, FeedbackDto, MessageSourcesDto, SubmitFeedbackRequestDto,
};
use crate::presentation::http::handlers::error_response;

pub struct FeedbackHandler {
    submit_feedback_use_case: Arc<SubmitFeedbackUseCase>,
    message_sources_use_case: Arc<GetMessageSourcesUseCase>,
}

impl FeedbackHandler {
    pub fn new(
        submit_feedback_use_case: Arc<SubmitFeedbackUseCase>,
        message_sources_use_case: Arc<GetMessageSourcesUseCase>,
    ) -> Self {
        Self {
            submit_feedback_use_case,
            message_sources_use_case,
        }
    }

    pub async fn submit_feedback(
        State(handler): State<Arc<FeedbackHandler>>,
        Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
        Path(message_id): Path<Uuid>,
        Json(body): Json<SubmitFeedbackRequestDto>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = SubmitFeedbackRequest {
            user_id,
            message_id,
            is_positive: body.is_positive,
            feedback_text: body.feedback_text,
        };

        match handler.submit_feedback_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(FeedbackDto::from(&response.feedback))),
            )),
            Err(e) => Ok(error_response(&e)),
        }
    }

    pub async fn get_sources(
        State(handler): State<Arc<FeedbackHandler>>,
        Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
        Path(message_id): Path<Uuid>,
    ) -> Result<impl IntoResponse, StatusCode> {
        let request = GetMessageSourcesRequest {
            user_id,
            message_id,
        };

        match handler.message_sources_use_case.execute(request).await {
            Ok(response) => Ok((
                StatusCode::OK,
                Json(ApiResponse::success(MessageSourcesDto::from(response))),
            )),
            Err(e) => Ok(error_response(&e)),
        }
    }
}
