//! Incoming events emitted by the story-execution engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::command::{ActionEvent, ConversationCommand, ReplyEvent, StartEvent};

/// The kind of narrative message delivered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Narrative output spoken or written by a character.
    Character,
    /// An announcement of an ambient asset change.
    Media,
    /// A grouped panel of narrative content.
    Panel,
}

/// The character a narrative message is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Engine-assigned character identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Optional avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Synthesized speech audio, either fetched by URL or delivered inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpeechAudio {
    /// A URL the client should fetch.
    Url(String),
    /// Raw encoded audio bytes.
    Buffer(Vec<u8>),
}

/// Speech attached to a character message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    /// The audio payload.
    pub audio: SpeechAudio,
    /// Playback duration in seconds.
    #[serde(default)]
    pub duration: f64,
}

/// Body of a narrative message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeMessage {
    /// Rendered narrative text (empty for pure media changes).
    #[serde(default)]
    pub text: String,
    /// The speaking character, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,
    /// Synthesized speech, if speech was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech: Option<Speech>,
    /// Free-form key/value strings consumed by media collaborators.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Engine-defined media change description, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<serde_json::Value>,
}

/// A narrative message event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Which kind of narrative message this is.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Stable identifier, usable as a rewind target.
    pub event_id: String,
    /// Whether the player should advance with a tap instead of typed input.
    #[serde(default)]
    pub tap_to_continue: bool,
    /// Whether this message ends the story.
    #[serde(default)]
    pub end_story: bool,
    /// Engine timestamp in milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// The message body.
    pub message: NarrativeMessage,
}

/// A problem reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemEvent {
    /// Machine-readable problem code.
    pub code: String,
    /// Human-readable description.
    pub error: String,
}

/// Reported when an episode of the story finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeCompleteEvent {
    /// The finished episode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<i64>,
    /// Position of the finished episode within the story.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_index: Option<u32>,
}

/// State of the underlying connection to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Not connected.
    Disconnected,
    /// Connection in progress.
    Connecting,
    /// Connected and ready for commands.
    Connected,
}

/// Every event a transport can deliver to a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ConversationEvent {
    /// A narrative message.
    Message(MessageEvent),
    /// The engine started composing a response.
    StartTyping,
    /// The engine stopped composing a response.
    StopTyping,
    /// An episode finished.
    EpisodeComplete(EpisodeCompleteEvent),
    /// The engine reported a problem.
    Problem(ProblemEvent),
    /// Speech playback started.
    PlaybackStart,
    /// Speech playback stopped.
    PlaybackStop,
    /// The connection status changed.
    ConnectionStatus(ConnectionStatus),
    /// Confirmation echo of a `start` command.
    Start(StartEvent),
    /// Confirmation echo of a `reply` command.
    Reply(ReplyEvent),
    /// Confirmation echo of a `tap` command.
    Tap,
    /// Confirmation echo of an `action` command.
    Action(ActionEvent),
    /// Confirmation echo of a `resume` command.
    Resume,
}

impl ConversationEvent {
    /// Returns the wire name of this event (used for logging).
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::StartTyping => "start-typing",
            Self::StopTyping => "stop-typing",
            Self::EpisodeComplete(_) => "episode-complete",
            Self::Problem(_) => "problem",
            Self::PlaybackStart => "playback-start",
            Self::PlaybackStop => "playback-stop",
            Self::ConnectionStatus(_) => "connection-status",
            Self::Start(_) => "start",
            Self::Reply(_) => "reply",
            Self::Tap => "tap",
            Self::Action(_) => "action",
            Self::Resume => "resume",
        }
    }

    /// Returns the confirmed command if this event is a confirmation echo.
    #[must_use]
    pub fn confirmed_command(&self) -> Option<ConversationCommand> {
        match self {
            Self::Start(event) => Some(ConversationCommand::Start(event.clone())),
            Self::Reply(event) => Some(ConversationCommand::Reply(event.clone())),
            Self::Tap => Some(ConversationCommand::Tap),
            Self::Action(event) => Some(ConversationCommand::Action(event.clone())),
            Self::Resume => Some(ConversationCommand::Resume),
            _ => None,
        }
    }
}
