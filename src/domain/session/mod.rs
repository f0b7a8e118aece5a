//! Connection session lifecycle and failure classification.

mod errors;
mod state;

pub use errors::{Disposition, SessionError};
pub use state::SessionState;
