//! In-process engine driven by a script.
//!
//! Commands sent by the conversation are logged and recorded; events are
//! delivered when the runner emits them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use parlance_core::command::{
    ActionEvent, Command, ConversationCommand, ReplyEvent, ReplyIntermediateEvent, SpeechConfig,
    StartEvent,
};
use parlance_core::error::ConversationError;
use parlance_core::event::ConversationEvent;
use parlance_core::transport::{ConversationTransport, EventListener, Playthrough};
use tracing::info;
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport for one scripted conversation.
#[derive(Default)]
pub struct ScriptedTransport {
    listeners: Mutex<Vec<Arc<dyn EventListener>>>,
    commands: Mutex<Vec<ConversationCommand>>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("commands", &*lock(&self.commands))
            .finish_non_exhaustive()
    }
}

impl ScriptedTransport {
    /// Delivers `event` to every subscribed listener.
    pub fn emit(&self, event: ConversationEvent) {
        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            listener.on_event(event.clone());
        }
    }

    /// Commands received so far.
    #[must_use]
    pub fn commands(&self) -> Vec<ConversationCommand> {
        lock(&self.commands).clone()
    }

    fn close(&self) {
        lock(&self.listeners).clear();
    }

    fn record(&self, command: ConversationCommand) {
        info!(command_type = command.command_type(), "engine received command");
        lock(&self.commands).push(command);
    }
}

#[async_trait]
impl ConversationTransport for ScriptedTransport {
    fn subscribe(&self, listener: Arc<dyn EventListener>) {
        lock(&self.listeners).push(listener);
    }

    fn start(&self, event: &StartEvent) {
        self.record(ConversationCommand::Start(event.clone()));
    }

    fn reply(&self, event: &ReplyEvent) {
        self.record(ConversationCommand::Reply(event.clone()));
    }

    fn reply_intermediate(&self, event: &ReplyIntermediateEvent) {
        self.record(ConversationCommand::ReplyIntermediate(event.clone()));
    }

    fn tap(&self) {
        self.record(ConversationCommand::Tap);
    }

    fn action(&self, event: &ActionEvent) {
        self.record(ConversationCommand::Action(event.clone()));
    }

    fn resume(&self) {
        self.record(ConversationCommand::Resume);
    }

    fn set_speech_config(&self, config: Option<&SpeechConfig>) {
        info!(enabled = config.is_some(), "engine speech config updated");
    }

    async fn restart_from_event_id(&self, event_id: &str) -> Result<(), ConversationError> {
        info!(event_id, "engine restarting from event");
        Ok(())
    }
}

/// Playthrough hosting scripted conversations.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    transports: Mutex<HashMap<Uuid, Arc<ScriptedTransport>>>,
}

impl ScriptedEngine {
    /// Transport of a joined conversation.
    #[must_use]
    pub fn transport(&self, conversation_uuid: Uuid) -> Option<Arc<ScriptedTransport>> {
        lock(&self.transports).get(&conversation_uuid).cloned()
    }
}

impl Playthrough for ScriptedEngine {
    fn join_conversation(
        &self,
        conversation_uuid: Uuid,
    ) -> Result<Arc<dyn ConversationTransport>, ConversationError> {
        let transport = Arc::new(ScriptedTransport::default());
        lock(&self.transports).insert(conversation_uuid, Arc::clone(&transport));
        info!(%conversation_uuid, "engine joined conversation");
        Ok(transport)
    }

    fn leave_conversation(&self, conversation_uuid: Uuid) {
        if let Some(transport) = lock(&self.transports).remove(&conversation_uuid) {
            transport.close();
        }
        info!(%conversation_uuid, "engine left conversation");
    }
}
