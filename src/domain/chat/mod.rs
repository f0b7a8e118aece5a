//! Chat messages, outbound deliveries and room listings.

mod delivery;
mod errors;
mod message;
mod room;

pub use delivery::ChatDelivery;
pub use errors::ChatError;
pub use message::{ChatContent, ChatInfo, ChatKind, ChatMessage, Poll, PollOption, MIN_POLL_OPTIONS};
pub use room::{sort_newest_first, ChatRoom};
