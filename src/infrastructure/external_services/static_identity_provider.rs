use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::ports::identity_provider::{IdentityError, IdentityProvider};

/// Resolves bearer tokens from the fixed `AUTH_TOKENS` table.
pub struct StaticTokenIdentityProvider {
    tokens: HashMap<String, Uuid>,
}

impl StaticTokenIdentityProvider {
    pub fn new(tokens: HashMap<String, Uuid>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentityProvider {
    async fn resolve(&self, bearer: &str) -> Result<Uuid, IdentityError> {
        let bearer = bearer.trim();
        if bearer.is_empty() {
            return Err(IdentityError::MissingCredential);
        }
        self.tokens
            .get(bearer)
            .copied()
            .ok_or(IdentityError::InvalidCredential)
    }
}
