//! Outgoing command payloads.
//!
//! These are the requests a client sends to the story-execution engine. They
//! serialize to the engine's camelCase wire format.

use serde::{Deserialize, Serialize};

/// Trait that all outgoing commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;
}

/// Payload for starting (or restarting from an entry point) a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    /// Index of the scene to start from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_index: Option<u32>,
    /// Numeric identifier of the subplot graph to start from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_graph_id: Option<i64>,
    /// Stable reference identifier of the subplot graph to start from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_graph_reference_id: Option<String>,
}

/// Payload for a committed player reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEvent {
    /// The text the player submitted.
    pub text: String,
}

/// How an intermediate reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Typed on a keyboard.
    Keyboard,
    /// Transcribed from a microphone.
    Microphone,
}

/// Payload for live, not-yet-committed player input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyIntermediateEvent {
    /// The text typed so far.
    pub text: String,
    /// Where the text came from.
    pub input_type: InputType,
}

/// Payload for a structured action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// The action identifier understood by the story.
    pub action: String,
}

/// Requested speech output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechOutput {
    /// Audio is delivered as a URL to fetch.
    Url,
    /// Audio is delivered inline as a byte buffer.
    Buffer,
}

/// Configures whether and how character speech is synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Acceptable audio encodings, in order of preference (e.g. `ogg`, `mp3`).
    pub encoding: Vec<String>,
    /// Delivery format for synthesized audio.
    pub output: SpeechOutput,
}

/// Every command a conversation can send to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ConversationCommand {
    /// Begin the conversation.
    Start(StartEvent),
    /// Commit a player reply.
    Reply(ReplyEvent),
    /// Stream interim player input.
    ReplyIntermediate(ReplyIntermediateEvent),
    /// Advance a tap-to-continue beat.
    Tap,
    /// Send a structured action.
    Action(ActionEvent),
    /// Resume a previously started session.
    Resume,
}

impl Command for ConversationCommand {
    fn command_type(&self) -> &'static str {
        match self {
            Self::Start(_) => "conversation.start",
            Self::Reply(_) => "conversation.reply",
            Self::ReplyIntermediate(_) => "conversation.reply_intermediate",
            Self::Tap => "conversation.tap",
            Self::Action(_) => "conversation.action",
            Self::Resume => "conversation.resume",
        }
    }
}
