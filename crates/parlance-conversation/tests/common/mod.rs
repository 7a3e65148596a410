//! Shared helpers for conversation integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parlance_conversation::{
    Conversation, ConversationHandler, ConversationOptions, ConversationState,
};
use parlance_core::clock::Clock;
use parlance_core::command::{ReplyEvent, StartEvent};
use parlance_core::error::ConversationError;
use parlance_core::event::{ConversationEvent, MessageEvent, MessageKind, NarrativeMessage};
use parlance_test_support::{FixedClock, RecordingPlaythrough, RecordingTransport};
use uuid::Uuid;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::default())
}

/// A joined conversation together with the doubles behind it.
pub struct Harness {
    pub conversation: Conversation,
    pub playthrough: Arc<RecordingPlaythrough>,
    pub transport: Arc<RecordingTransport>,
    pub journal: Arc<Journal>,
}

impl Harness {
    /// Emits `event` on the transport as the engine would.
    pub fn emit(&self, event: ConversationEvent) {
        self.transport.emit(event);
    }

    /// Event ids of the narrative messages in history.
    pub fn history(&self) -> Vec<String> {
        self.conversation
            .state()
            .messages
            .iter()
            .filter_map(|stored| stored.event_id().map(str::to_owned))
            .collect()
    }
}

/// Join a fresh conversation on a recording playthrough.
pub fn join(options: ConversationOptions, journal: Journal) -> Harness {
    join_on(Arc::new(RecordingPlaythrough::new()), options, journal)
}

/// Join a fresh conversation on `playthrough`.
pub fn join_on(
    playthrough: Arc<RecordingPlaythrough>,
    options: ConversationOptions,
    journal: Journal,
) -> Harness {
    let uuid = Uuid::new_v4();
    let journal = Arc::new(journal);
    let conversation = Conversation::join_with_clock(
        playthrough.clone(),
        uuid,
        options,
        journal.clone(),
        fixed_clock(),
    )
    .unwrap();
    let transport = playthrough.transport(uuid).unwrap();
    Harness {
        conversation,
        playthrough,
        transport,
        journal,
    }
}

/// A `character` message event.
pub fn character(event_id: &str, tap_to_continue: bool, text: &str) -> ConversationEvent {
    ConversationEvent::Message(MessageEvent {
        kind: MessageKind::Character,
        event_id: event_id.to_owned(),
        tap_to_continue,
        end_story: false,
        timestamp: 0,
        message: NarrativeMessage {
            text: text.to_owned(),
            ..NarrativeMessage::default()
        },
    })
}

pub fn reply(text: &str) -> ReplyEvent {
    ReplyEvent {
        text: text.to_owned(),
    }
}

pub fn start_at(reference_id: &str) -> StartEvent {
    StartEvent {
        start_graph_reference_id: Some(reference_id.to_owned()),
        ..StartEvent::default()
    }
}

/// Handler that journals messages, state sizes and commands it was told
/// about. `on_message` can be slowed down per event id, and the state hook
/// can block for a while at a chosen history length.
#[derive(Debug, Default)]
pub struct Journal {
    label: &'static str,
    entries: Mutex<Vec<String>>,
    delays: HashMap<String, Duration>,
    stall_state_at: Option<usize>,
    stalled: AtomicBool,
}

impl Journal {
    pub fn labelled(label: &'static str) -> Self {
        Self {
            label,
            ..Self::default()
        }
    }

    pub fn with_delays(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays
                .iter()
                .map(|(id, ms)| ((*id).to_owned(), Duration::from_millis(*ms)))
                .collect(),
            ..Self::default()
        }
    }

    /// Blocks the state hook for 100ms when history reaches `len` messages.
    pub fn stalling_state_at(len: usize) -> Self {
        Self {
            stall_state_at: Some(len),
            ..Self::default()
        }
    }

    /// Whether the state hook has started stalling.
    pub fn stalled(&self) -> bool {
        self.stalled.load(Ordering::Acquire)
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.contains("message:"))
            .collect()
    }

    pub fn states(&self) -> Vec<usize> {
        self.entries()
            .iter()
            .filter_map(|entry| entry.strip_prefix("state:"))
            .map(|len| len.parse().unwrap())
            .collect()
    }

    fn push(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl ConversationHandler for Journal {
    async fn on_message(&self, event: &MessageEvent) -> Result<(), ConversationError> {
        if let Some(delay) = self.delays.get(&event.event_id) {
            tokio::time::sleep(*delay).await;
        }
        self.push(format!("{}message:{}", self.label, event.event_id));
        Ok(())
    }

    fn on_start(&self, _event: &StartEvent) {
        self.push("start".to_owned());
    }

    fn on_reply(&self, event: &ReplyEvent) {
        self.push(format!("reply:{}", event.text));
    }

    fn on_tap(&self) {
        self.push("tap".to_owned());
    }

    fn on_state_change(&self, state: &ConversationState) {
        if self.stall_state_at == Some(state.messages.len()) {
            self.stalled.store(true, Ordering::Release);
            std::thread::sleep(Duration::from_millis(100));
        }
        self.push(format!("state:{}", state.messages.len()));
    }
}
