//! Connection authentication.

mod authenticate;

pub use authenticate::{AuthenticateCommand, AuthenticateHandler};
