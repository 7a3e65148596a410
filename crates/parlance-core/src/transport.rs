//! Transport capability traits.
//!
//! A transport owns the connection to the engine (framing, authentication,
//! reconnection). The session engine only needs the operations below.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::command::{
    ActionEvent, ConversationCommand, ReplyEvent, ReplyIntermediateEvent, SpeechConfig,
    StartEvent,
};
use crate::error::ConversationError;
use crate::event::ConversationEvent;

/// Receives events a transport delivers for one conversation.
///
/// Transports must call `on_event` in the order events were received.
pub trait EventListener: Send + Sync {
    /// Called for every event the transport delivers.
    fn on_event(&self, event: ConversationEvent);
}

/// Commands and subscriptions for a single joined conversation.
///
/// Every command except `restart_from_event_id` is fire-and-forget: failures
/// are reported later as `problem` events.
#[async_trait]
pub trait ConversationTransport: Send + Sync {
    /// Registers a listener for events on this conversation.
    fn subscribe(&self, listener: Arc<dyn EventListener>);

    /// Asks the engine to begin the conversation.
    fn start(&self, event: &StartEvent);

    /// Sends a committed player reply.
    fn reply(&self, event: &ReplyEvent);

    /// Streams interim player input.
    fn reply_intermediate(&self, event: &ReplyIntermediateEvent);

    /// Advances a tap-to-continue beat.
    fn tap(&self);

    /// Sends a structured action verbatim.
    fn action(&self, event: &ActionEvent);

    /// Resumes a previously started session without resetting it.
    fn resume(&self);

    /// Configures speech synthesis for subsequent turns. `None` disables it.
    fn set_speech_config(&self, config: Option<&SpeechConfig>);

    /// Asks the engine to resynchronize from just before `event_id`.
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::Transport` if the engine rejects the request.
    async fn restart_from_event_id(&self, event_id: &str) -> Result<(), ConversationError>;

    /// Sends any command through the matching operation.
    fn dispatch(&self, command: &ConversationCommand) {
        match command {
            ConversationCommand::Start(event) => self.start(event),
            ConversationCommand::Reply(event) => self.reply(event),
            ConversationCommand::ReplyIntermediate(event) => self.reply_intermediate(event),
            ConversationCommand::Tap => self.tap(),
            ConversationCommand::Action(event) => self.action(event),
            ConversationCommand::Resume => self.resume(),
        }
    }
}

/// A connected playthrough that hosts conversations.
pub trait Playthrough: Send + Sync {
    /// Joins a conversation and returns its transport.
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::Transport` if the conversation cannot be joined.
    fn join_conversation(
        &self,
        conversation_uuid: Uuid,
    ) -> Result<Arc<dyn ConversationTransport>, ConversationError>;

    /// Leaves a conversation. Its transport stops delivering events.
    ///
    /// Implementations must drop every listener subscribed through the
    /// conversation's transport, so nothing it delivered to stays reachable.
    fn leave_conversation(&self, conversation_uuid: Uuid);
}
