//! Conversation error types.

use thiserror::Error;

/// Top-level error type for the conversation session engine.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// The transport rejected or failed a request.
    #[error("transport error: {0}")]
    Transport(String),

    /// A restart was requested while another restart was still in flight.
    #[error("a restart is already in progress")]
    RestartInProgress,

    /// A consumer handler failed while processing a queued event.
    #[error("handler error: {0}")]
    Handler(String),

    /// A queued task exceeded the configured watchdog timeout.
    #[error("task for event {event_id} timed out after {timeout_ms}ms")]
    TaskTimedOut {
        /// The event whose handler stalled.
        event_id: String,
        /// The configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The conversation has been left and no longer accepts commands.
    #[error("conversation has been closed")]
    Closed,
}
