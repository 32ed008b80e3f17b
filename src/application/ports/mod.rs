pub mod generation_provider;
pub mod identity_provider;
pub mod retrieval_provider;

pub use generation_provider::GenerationProvider;
pub use identity_provider::IdentityProvider;
pub use retrieval_provider::RetrievalProvider;
