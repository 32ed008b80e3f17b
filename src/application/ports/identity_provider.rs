use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Missing bearer credential")]
    MissingCredential,
    #[error("Invalid bearer credential")]
    InvalidCredential,
}

/// Resolves a bearer credential to the user it belongs to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, bearer: &str) -> Result<Uuid, IdentityError>;
}
