//! Consumer-supplied callbacks.

use async_trait::async_trait;
use parlance_core::command::{ActionEvent, ConversationCommand, ReplyEvent, StartEvent};
use parlance_core::error::ConversationError;
use parlance_core::event::{ConnectionStatus, EpisodeCompleteEvent, MessageEvent, ProblemEvent};

use crate::domain::state::ConversationState;

/// Callbacks a host application implements to react to a conversation.
///
/// Every method has a no-op default. `on_message` runs inside the event
/// serialization queue: the next narrative message is not applied until the
/// returned future completes, so it is the place to await side effects such
/// as the start of speech playback.
#[async_trait]
pub trait ConversationHandler: Send + Sync {
    /// A narrative message has just been appended to history.
    ///
    /// # Errors
    ///
    /// Errors are logged by the queue and do not stop later messages.
    async fn on_message(&self, _event: &MessageEvent) -> Result<(), ConversationError> {
        Ok(())
    }

    /// The engine started composing.
    fn on_start_typing(&self) {}

    /// The engine stopped composing.
    fn on_stop_typing(&self) {}

    /// An episode finished.
    fn on_episode_complete(&self, _event: &EpisodeCompleteEvent) {}

    /// The engine reported a problem.
    fn on_problem(&self, _event: &ProblemEvent) {}

    /// Speech playback started.
    fn on_playback_start(&self) {}

    /// Speech playback stopped.
    fn on_playback_stop(&self) {}

    /// The connection status changed.
    fn on_connection_status(&self, _status: ConnectionStatus) {}

    /// The engine confirmed a command.
    fn on_confirmed(&self, _command: &ConversationCommand) {}

    /// About to send `start`.
    fn on_start(&self, _event: &StartEvent) {}

    /// About to send `reply`.
    fn on_reply(&self, _event: &ReplyEvent) {}

    /// About to send `tap`.
    fn on_tap(&self) {}

    /// About to send `action`.
    fn on_action(&self, _event: &ActionEvent) {}

    /// About to send `resume`.
    fn on_resume(&self) {}

    /// State changed. Hosts use this to persist a snapshot.
    ///
    /// Calls arrive one at a time in transition order, so the last snapshot
    /// seen is always the current state. Issuing commands from here
    /// deadlocks.
    fn on_state_change(&self, _state: &ConversationState) {}
}

/// A handler that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl ConversationHandler for NoopHandler {}
