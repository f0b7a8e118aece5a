//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the relay core and the services it relies on. Adapters implement them.
//!
//! - `TokenVerifier` - Turns an access token into a user id
//! - `Directory` - Reads users, groups and group membership
//! - `ChatStore` - Persists chat messages and aggregates rooms

mod chat_store;
mod directory;
mod token_verifier;

pub use chat_store::ChatStore;
pub use directory::Directory;
pub use token_verifier::TokenVerifier;
