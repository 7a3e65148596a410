//! Conversation configuration.

use std::time::Duration;

use parlance_core::command::{SpeechConfig, StartEvent};
use serde::Deserialize;

use crate::domain::state::ConversationState;

/// Options fixed when a conversation is joined.
///
/// Deserializes from camelCase JSON so hosts can keep it alongside their own
/// configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversationOptions {
    /// Send `resume` the first time the connection becomes ready.
    pub should_resume_on_connect: bool,
    /// Send `start` with this payload the first time the connection becomes
    /// ready.
    pub should_start_on_connect: Option<StartEvent>,
    /// Speech synthesis settings pushed to the transport on join.
    pub speech_config: Option<SpeechConfig>,
    /// Stream typed text to the engine as intermediate replies.
    pub send_intermediate_events: bool,
    /// State to restore instead of starting empty.
    pub initial_state: Option<ConversationState>,
    /// Also reset the event queue after a confirmed restart.
    pub reset_queue_on_restart: bool,
    /// Watchdog for a single queued `on_message` call, in milliseconds.
    pub task_timeout_ms: Option<u64>,
}

impl ConversationOptions {
    /// The watchdog limit for queued tasks, if configured.
    #[must_use]
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }
}
