//! Test transport — records commands and lets tests emit engine events.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parlance_core::command::{
    ActionEvent, ConversationCommand, ReplyEvent, ReplyIntermediateEvent, SpeechConfig,
    StartEvent,
};
use parlance_core::error::ConversationError;
use parlance_core::event::ConversationEvent;
use parlance_core::transport::{ConversationTransport, EventListener};
use tokio::sync::Notify;

/// A transport that records every command and restart request.
///
/// Restarts succeed immediately unless the transport was built with
/// [`RecordingTransport::failing_restarts`] or
/// [`RecordingTransport::gated_restarts`].
#[derive(Default)]
pub struct RecordingTransport {
    commands: Mutex<Vec<ConversationCommand>>,
    speech_configs: Mutex<Vec<Option<SpeechConfig>>>,
    restarts: Mutex<Vec<String>>,
    listeners: Mutex<Vec<Arc<dyn EventListener>>>,
    restart_error: Option<String>,
    restart_gate: Option<Arc<Notify>>,
}

impl std::fmt::Debug for RecordingTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingTransport")
            .field("commands", &self.commands())
            .field("restarts", &self.restarts())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl RecordingTransport {
    /// Creates a transport whose restarts succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose restarts fail with `message`.
    #[must_use]
    pub fn failing_restarts(message: &str) -> Self {
        Self {
            restart_error: Some(message.to_owned()),
            ..Self::default()
        }
    }

    /// Creates a transport whose restarts wait for `gate` to be notified.
    #[must_use]
    pub fn gated_restarts(gate: Arc<Notify>) -> Self {
        Self {
            restart_gate: Some(gate),
            ..Self::default()
        }
    }

    /// Returns a snapshot of all commands sent so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn commands(&self) -> Vec<ConversationCommand> {
        self.commands.lock().unwrap().clone()
    }

    /// Returns every speech config pushed so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn speech_configs(&self) -> Vec<Option<SpeechConfig>> {
        self.speech_configs.lock().unwrap().clone()
    }

    /// Returns the event ids of every restart request.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn restarts(&self) -> Vec<String> {
        self.restarts.lock().unwrap().clone()
    }

    /// Number of subscribed listeners.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Delivers `event` to every listener, as the engine would.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn emit(&self, event: ConversationEvent) {
        let listeners = self.listeners.lock().unwrap().clone();
        for listener in listeners {
            listener.on_event(event.clone());
        }
    }

    /// Drops every listener, as leaving a conversation does.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear_listeners(&self) {
        self.listeners.lock().unwrap().clear();
    }

    fn record(&self, command: ConversationCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

#[async_trait]
impl ConversationTransport for RecordingTransport {
    fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.listeners.lock().unwrap().push(listener);
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
        self.speech_configs.lock().unwrap().push(config.cloned());
    }

    async fn restart_from_event_id(&self, event_id: &str) -> Result<(), ConversationError> {
        self.restarts.lock().unwrap().push(event_id.to_owned());
        if let Some(gate) = &self.restart_gate {
            gate.notified().await;
        }
        match &self.restart_error {
            Some(message) => Err(ConversationError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}
