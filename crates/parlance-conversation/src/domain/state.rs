//! Conversation state and its reducer.
//!
//! Every transition is a pure function of the previous state and an action.
//! Nothing here depends on timing, the transport, or the runtime.

use parlance_core::event::MessageEvent;
use serde::{Deserialize, Serialize};

use super::messages::{ChatMode, PlayerMessage, StoredMessage};

/// The visible state of one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    /// Text currently in the player's input box.
    pub input_value: String,
    /// Whether the engine is composing a response.
    pub is_typing: bool,
    /// Append-only history in arrival order.
    pub messages: Vec<StoredMessage>,
    /// How the player is expected to respond next.
    pub mode: ChatMode,
}

impl ConversationState {
    /// Returns the index a restart to `event_id` truncates at, if the event is
    /// in history. The last matching narrative message wins.
    #[must_use]
    pub fn rewind_index(&self, event_id: &str) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|message| message.event_id() == Some(event_id))
    }
}

/// A transition request for [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationAction {
    /// A narrative message (character, media or panel) arrived.
    MessageCharacter(MessageEvent),
    /// The player replied.
    MessagePlayer(PlayerMessage),
    /// The engine started composing.
    StartTyping,
    /// The engine stopped composing.
    StopTyping,
    /// The player edited their input.
    Type(String),
    /// History was cleared for a fresh start.
    Reset,
    /// History was rewound to just before the given event id.
    Restart(String),
}

impl ConversationAction {
    /// Returns the action name (used for logging).
    #[must_use]
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::MessageCharacter(_) => "MESSAGE_CHARACTER",
            Self::MessagePlayer(_) => "MESSAGE_PLAYER",
            Self::StartTyping => "START_TYPING",
            Self::StopTyping => "STOP_TYPING",
            Self::Type(_) => "TYPE",
            Self::Reset => "RESET",
            Self::Restart(_) => "RESTART",
        }
    }
}

/// Applies `action` to `state` and returns the next state.
///
/// A restart to an event id that is not in history returns the state
/// unchanged.
#[must_use]
pub fn reduce(state: ConversationState, action: ConversationAction) -> ConversationState {
    match action {
        ConversationAction::MessageCharacter(event) => {
            let mode = if event.tap_to_continue {
                ChatMode::Tap
            } else {
                ChatMode::Chat
            };
            let mut messages = state.messages;
            messages.push(StoredMessage::Narrative(event));
            ConversationState {
                messages,
                mode,
                ..state
            }
        }
        ConversationAction::MessagePlayer(message) => {
            let mut messages = state.messages;
            messages.push(StoredMessage::Player(message));
            ConversationState {
                messages,
                input_value: String::new(),
                ..state
            }
        }
        ConversationAction::StartTyping => ConversationState {
            is_typing: true,
            ..state
        },
        ConversationAction::StopTyping => ConversationState {
            is_typing: false,
            ..state
        },
        ConversationAction::Type(text) => ConversationState {
            input_value: text,
            ..state
        },
        ConversationAction::Reset => ConversationState {
            messages: Vec::new(),
            ..state
        },
        ConversationAction::Restart(event_id) => match state.rewind_index(&event_id) {
            Some(index) => {
                let mut messages = state.messages;
                messages.truncate(index);
                ConversationState { messages, ..state }
            }
            None => state,
        },
    }
}
