//! Replays a script against the scripted engine.

use std::sync::Arc;

use async_trait::async_trait;
use parlance_conversation::{Conversation, ConversationHandler, StoredMessage};
use parlance_core::command::{ActionEvent, ConversationCommand, ReplyEvent};
use parlance_core::error::ConversationError;
use parlance_core::event::{
    ConnectionStatus, ConversationEvent, EpisodeCompleteEvent, MessageEvent, MessageKind,
    ProblemEvent,
};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::engine::ScriptedEngine;
use crate::error::AppError;
use crate::script::{Script, Step};

/// Result of a replay.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    /// Final history, one rendered line per message.
    pub transcript: Vec<String>,
    /// Every command the engine received, in order.
    pub commands: Vec<ConversationCommand>,
}

/// Logs what the conversation plays.
#[derive(Debug, Default)]
struct LoggingHandler;

#[async_trait]
impl ConversationHandler for LoggingHandler {
    async fn on_message(&self, event: &MessageEvent) -> Result<(), ConversationError> {
        info!(
            event_id = %event.event_id,
            kind = ?event.kind,
            end_story = event.end_story,
            "narrative message played"
        );
        Ok(())
    }

    fn on_episode_complete(&self, event: &EpisodeCompleteEvent) {
        info!(episode_id = ?event.episode_id, "episode complete");
    }

    fn on_problem(&self, event: &ProblemEvent) {
        warn!(code = %event.code, error = %event.error, "engine problem");
    }
}

/// Renders one history entry as a transcript line.
#[must_use]
pub fn render(message: &StoredMessage) -> String {
    match message {
        StoredMessage::Player(player) => format!("> {}", player.message.text),
        StoredMessage::Narrative(event) => match (event.kind, &event.message.character) {
            (MessageKind::Panel, _) => format!("[panel] {}", event.message.text),
            (MessageKind::Media, _) => format!("[media] {}", event.message.text),
            (MessageKind::Character, Some(character)) => {
                format!("{}: {}", character.name, event.message.text)
            }
            (MessageKind::Character, None) => event.message.text.clone(),
        },
    }
}

/// Joins the script's conversation on a fresh engine, replays every step,
/// and returns the final transcript.
///
/// # Errors
///
/// Returns `AppError::Conversation` if the conversation cannot be joined.
/// Rejected restarts are logged and the replay continues.
#[instrument(skip_all, fields(conversation_uuid = %script.conversation_uuid))]
pub async fn run(config: &Config, script: Script) -> Result<Replay, AppError> {
    let engine = Arc::new(ScriptedEngine::default());
    let conversation = Conversation::join(
        engine.clone(),
        script.conversation_uuid,
        config.conversation_options(script.start.as_ref()),
        Arc::new(LoggingHandler),
    )?;
    let transport = engine.transport(script.conversation_uuid).ok_or_else(|| {
        ConversationError::Transport("scripted engine lost the joined conversation".to_owned())
    })?;

    transport.emit(ConversationEvent::ConnectionStatus(ConnectionStatus::Connected));
    if let Some(start) = script.start.filter(|_| !config.start_on_connect) {
        conversation.start(start);
    }

    for step in script.steps {
        match step {
            Step::Event(event) => transport.emit(event),
            Step::Type(text) => conversation.type_text(text),
            Step::Reply(text) => {
                conversation.wait_idle().await;
                conversation.reply(ReplyEvent { text });
            }
            Step::Tap => {
                conversation.wait_idle().await;
                conversation.tap();
            }
            Step::Action(action) => {
                conversation.wait_idle().await;
                conversation.action(ActionEvent { action });
            }
            Step::Resume => conversation.resume(),
            Step::Restart(event_id) => {
                conversation.wait_idle().await;
                match conversation.restart(&event_id).await {
                    Ok(outcome) => info!(%event_id, ?outcome, "restart applied"),
                    Err(error) => warn!(%event_id, %error, "restart rejected"),
                }
            }
        }
    }
    conversation.wait_idle().await;

    let transcript = conversation.view().messages.iter().map(render).collect();
    conversation.leave();
    Ok(Replay {
        transcript,
        commands: transport.commands(),
    })
}
