//! Parlance — conversation session engine.
//!
//! Consumes the asynchronous event stream of a story-execution engine,
//! applies narrative messages to visible state strictly in arrival order,
//! and translates user intents into transport commands.

pub mod application;
pub mod domain;

#[cfg(test)]
mod test_support;

pub use application::conversation::Conversation;
pub use application::handler::ConversationHandler;
pub use application::options::ConversationOptions;
pub use application::restart::RestartOutcome;
pub use application::view::ConversationView;
pub use domain::messages::{ChatMode, PlayerMessage, StoredMessage};
pub use domain::state::ConversationState;
