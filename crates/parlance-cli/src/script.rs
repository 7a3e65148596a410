//! Replay script format.
//!
//! ```json
//! {
//!   "conversationUuid": "6f1c8f0e-3f4b-4b7e-9a61-0d0e3c0b9a11",
//!   "start": { "startGraphReferenceId": "intro" },
//!   "steps": [
//!     { "event": { "type": "message", "payload": { "type": "character", "eventId": "1", "message": { "text": "Hello" } } } },
//!     { "reply": "Hi there" },
//!     "tap",
//!     { "restart": "1" }
//!   ]
//! }
//! ```

use std::path::Path;

use parlance_core::command::StartEvent;
use parlance_core::event::ConversationEvent;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

/// A scripted conversation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Conversation to join.
    pub conversation_uuid: Uuid,
    /// Entry point to start from, if the conversation should be started.
    #[serde(default)]
    pub start: Option<StartEvent>,
    /// Steps replayed in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One step of a script: an engine event or a player intent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    /// The engine delivers this event.
    Event(ConversationEvent),
    /// The player types into the input box.
    Type(String),
    /// The player replies.
    Reply(String),
    /// The player taps to continue.
    Tap,
    /// The player triggers an action.
    Action(String),
    /// The player resumes the session.
    Resume,
    /// The player rewinds to before this event id.
    Restart(String),
}

impl Script {
    /// Parses a script from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Script` if the text is not a valid script.
    pub fn parse(json: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses the script at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be read, or
    /// `AppError::Script` if it is not a valid script.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)?;
        Self::parse(&json)
    }
}
