pub mod generation_client;
pub mod search_client;
pub mod static_identity_provider;

pub use generation_client::{GenerationClientConfig, HttpGenerationProvider};
pub use search_client::{HttpRetrievalProvider, SearchClientConfig};
pub use static_identity_provider::StaticTokenIdentityProvider;
