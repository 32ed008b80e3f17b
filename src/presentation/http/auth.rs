use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::application::ports::identity_provider::{IdentityError, IdentityProvider};
use crate::presentation::http::dto::ApiResponse;

/// The caller resolved by [`require_auth`], available to handlers as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

pub fn bearer_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn authenticate(
    identity: &dyn IdentityProvider,
    bearer: Option<&str>,
) -> Result<AuthenticatedUser, IdentityError> {
    let bearer = bearer.ok_or(IdentityError::MissingCredential)?;
    identity.resolve(bearer).await.map(AuthenticatedUser)
}

pub fn unauthorized(error: &IdentityError) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(
            "unauthorized".to_string(),
            error.to_string(),
            None,
        )),
    )
        .into_response()
}

pub async fn require_auth(
    State(identity): State<Arc<dyn IdentityProvider>>,
    mut req: Request,
    next: Next,
) -> Response {
    let bearer = bearer_from_headers(req.headers()).map(str::to_string);

    match authenticate(identity.as_ref(), bearer.as_deref()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => {
            debug!(error = %e, uri = %req.uri(), "rejected unauthenticated request");
            unauthorized(&e)
        }
    }
}
