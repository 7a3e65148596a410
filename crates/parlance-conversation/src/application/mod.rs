//! Runtime components that drive the conversation state machine.

pub mod conversation;
pub mod dispatcher;
pub mod handler;
pub mod latest;
pub mod options;
pub mod queue;
pub mod restart;
pub mod router;
pub mod store;
pub mod view;
