//! Parlance CLI — error types.

use parlance_core::error::ConversationError;
use thiserror::Error;

/// Startup and runtime errors for the CLI.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The script file is not valid JSON or does not match the script format.
    #[error("script error: {0}")]
    Script(#[from] serde_json::Error),

    /// The script file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The conversation could not be joined or a restart failed.
    #[error("conversation error: {0}")]
    Conversation(#[from] ConversationError),
}
