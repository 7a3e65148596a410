//! Handler double shared by this crate's unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use parlance_core::command::{ActionEvent, Command, ConversationCommand, ReplyEvent, StartEvent};
use parlance_core::error::ConversationError;
use parlance_core::event::{ConnectionStatus, EpisodeCompleteEvent, MessageEvent, ProblemEvent};

use crate::application::handler::ConversationHandler;
use crate::domain::state::ConversationState;

/// Records every callback as a short string, e.g. `message:42` or `state:3`.
///
/// `on_message` can be slowed down per event id, and can fail for chosen ids.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<String>>,
    delays: HashMap<String, Duration>,
    failing: Vec<String>,
}

impl RecordingHandler {
    pub fn with_delays(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(id, ms)| ((*id).to_owned(), Duration::from_millis(*ms)))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| (*id).to_owned()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls with the given prefix, e.g. `message`.
    pub fn calls_of(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.split(':').next() == Some(prefix))
            .collect()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl ConversationHandler for RecordingHandler {
    async fn on_message(&self, event: &MessageEvent) -> Result<(), ConversationError> {
        if let Some(delay) = self.delays.get(&event.event_id) {
            tokio::time::sleep(*delay).await;
        }
        self.record(format!("message:{}", event.event_id));
        if self.failing.contains(&event.event_id) {
            return Err(ConversationError::Handler(format!(
                "cannot play {}",
                event.event_id
            )));
        }
        Ok(())
    }

    fn on_start_typing(&self) {
        self.record("start-typing");
    }

    fn on_stop_typing(&self) {
        self.record("stop-typing");
    }

    fn on_episode_complete(&self, _event: &EpisodeCompleteEvent) {
        self.record("episode-complete");
    }

    fn on_problem(&self, event: &ProblemEvent) {
        self.record(format!("problem:{}", event.code));
    }

    fn on_playback_start(&self) {
        self.record("playback-start");
    }

    fn on_playback_stop(&self) {
        self.record("playback-stop");
    }

    fn on_connection_status(&self, status: ConnectionStatus) {
        self.record(format!("connection:{status:?}"));
    }

    fn on_confirmed(&self, command: &ConversationCommand) {
        self.record(format!("confirmed:{}", command.command_type()));
    }

    fn on_start(&self, _event: &StartEvent) {
        self.record("start");
    }

    fn on_reply(&self, event: &ReplyEvent) {
        self.record(format!("reply:{}", event.text));
    }

    fn on_tap(&self) {
        self.record("tap");
    }

    fn on_action(&self, event: &ActionEvent) {
        self.record(format!("action:{}", event.action));
    }

    fn on_resume(&self) {
        self.record("resume");
    }

    fn on_state_change(&self, state: &ConversationState) {
        self.record(format!("state:{}", state.messages.len()));
    }
}
