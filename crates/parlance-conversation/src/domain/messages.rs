//! Messages held in conversation history.

use parlance_core::event::{MessageEvent, MessageKind};
use serde::{Deserialize, Serialize};

/// Whether the player answers with typed input or advances with a tap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// The player replies with text.
    #[default]
    Chat,
    /// The player advances with a content-free tap.
    Tap,
}

/// Marker serialized as `"type": "player"` on player echoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerTag {
    /// The only value.
    Player,
}

/// Body of a player echo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerText {
    /// The text the player submitted.
    pub text: String,
}

/// A local echo of the player's own reply. Has no engine event id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMessage {
    /// Always `player`.
    #[serde(rename = "type")]
    pub tag: PlayerTag,
    /// Local time of the reply in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// The submitted text.
    pub message: PlayerText,
}

impl PlayerMessage {
    /// Creates a player echo stamped with `timestamp`.
    #[must_use]
    pub fn new(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            tag: PlayerTag::Player,
            timestamp,
            message: PlayerText { text: text.into() },
        }
    }
}

/// An entry in conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredMessage {
    /// The player's own reply.
    Player(PlayerMessage),
    /// Narrative output delivered by the engine.
    Narrative(MessageEvent),
}

impl StoredMessage {
    /// Returns the engine event id, if this message carries one.
    #[must_use]
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::Narrative(event) => Some(event.event_id.as_str()),
            Self::Player(_) => None,
        }
    }

    /// Returns the narrative kind, or `None` for player echoes.
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Self::Narrative(event) => Some(event.kind),
            Self::Player(_) => None,
        }
    }

    /// Returns the displayable text of the message.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Narrative(event) => &event.message.text,
            Self::Player(player) => &player.message.text,
        }
    }
}

impl From<MessageEvent> for StoredMessage {
    fn from(event: MessageEvent) -> Self {
        Self::Narrative(event)
    }
}

impl From<PlayerMessage> for StoredMessage {
    fn from(message: PlayerMessage) -> Self {
        Self::Player(message)
    }
}
