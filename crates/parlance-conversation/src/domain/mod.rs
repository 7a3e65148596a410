//! Pure conversation state and its transitions.

pub mod messages;
pub mod state;
