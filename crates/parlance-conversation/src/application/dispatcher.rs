//! Command dispatcher.
//!
//! Translates user intents into transport commands. Local state updates
//! (clearing history on start, echoing the player's reply) are applied
//! synchronously, before the command leaves, and never wait for the engine
//! to acknowledge anything.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parlance_core::clock::Clock;
use parlance_core::command::{
    ActionEvent, Command, ConversationCommand, InputType, ReplyEvent, ReplyIntermediateEvent,
    SpeechConfig, StartEvent,
};
use parlance_core::event::MessageEvent;
use parlance_core::transport::ConversationTransport;
use tracing::{debug, info};
use uuid::Uuid;

use super::handler::ConversationHandler;
use super::latest::Latest;
use super::queue::EventQueue;
use super::store::StateStore;
use crate::domain::messages::PlayerMessage;
use crate::domain::state::ConversationAction;

/// Sends user intents to the transport.
pub struct CommandDispatcher {
    transport: Arc<dyn ConversationTransport>,
    store: Arc<StateStore>,
    queue: Arc<EventQueue<MessageEvent>>,
    handler: Arc<Latest<dyn ConversationHandler>>,
    clock: Arc<dyn Clock>,
    send_intermediate_events: bool,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("send_intermediate_events", &self.send_intermediate_events)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ConversationTransport>,
        store: Arc<StateStore>,
        queue: Arc<EventQueue<MessageEvent>>,
        handler: Arc<Latest<dyn ConversationHandler>>,
        clock: Arc<dyn Clock>,
        send_intermediate_events: bool,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            store,
            queue,
            handler,
            clock,
            send_intermediate_events,
            closed,
        }
    }

    fn is_closed(&self, intent: &'static str) -> bool {
        let closed = self.closed.load(Ordering::Acquire);
        if closed {
            debug!(intent, "conversation closed; ignoring command");
        }
        closed
    }

    /// Sends `command` as-is, without local state changes or notifications.
    pub fn send(&self, command: &ConversationCommand) {
        if self.is_closed(command.command_type()) {
            return;
        }
        let correlation_id = Uuid::new_v4();
        info!(
            command_type = command.command_type(),
            %correlation_id,
            "sending command"
        );
        self.transport.dispatch(command);
    }

    /// Clears history, notifies the handler, and asks the engine to start.
    pub fn start(&self, event: StartEvent) {
        if self.is_closed("start") {
            return;
        }
        self.store.dispatch(ConversationAction::Reset);
        self.handler.get().on_start(&event);
        self.send(&ConversationCommand::Start(event));
    }

    /// Echoes the reply into history, abandons unseen narrative backlog, and
    /// forwards the reply.
    pub fn reply(&self, event: ReplyEvent) {
        if self.is_closed("reply") {
            return;
        }
        self.handler.get().on_reply(&event);
        let echo = PlayerMessage::new(event.text.clone(), self.clock.now_millis());
        self.store.dispatch(ConversationAction::MessagePlayer(echo));
        let discarded = self.queue.reset();
        if discarded > 0 {
            info!(discarded, "reply superseded pending narrative events");
        }
        self.send(&ConversationCommand::Reply(event));
    }

    /// Advances a tap-to-continue beat.
    pub fn tap(&self) {
        if self.is_closed("tap") {
            return;
        }
        self.handler.get().on_tap();
        self.send(&ConversationCommand::Tap);
    }

    /// Forwards a structured action verbatim.
    pub fn action(&self, event: ActionEvent) {
        if self.is_closed("action") {
            return;
        }
        self.handler.get().on_action(&event);
        self.send(&ConversationCommand::Action(event));
    }

    /// Resumes a previously started session without touching history.
    pub fn resume(&self) {
        if self.is_closed("resume") {
            return;
        }
        self.handler.get().on_resume();
        self.send(&ConversationCommand::Resume);
    }

    /// Streams interim text without touching history.
    pub fn reply_intermediate(&self, event: ReplyIntermediateEvent) {
        self.send(&ConversationCommand::ReplyIntermediate(event));
    }

    /// Updates the input box, streaming it to the engine when configured.
    pub fn type_text(&self, text: String) {
        if self.is_closed("type") {
            return;
        }
        if self.send_intermediate_events {
            self.reply_intermediate(ReplyIntermediateEvent {
                text: text.clone(),
                input_type: InputType::Keyboard,
            });
        }
        self.store.dispatch(ConversationAction::Type(text));
    }

    /// Pushes speech settings to the transport.
    pub fn set_speech_config(&self, config: Option<&SpeechConfig>) {
        if self.is_closed("set_speech_config") {
            return;
        }
        info!(enabled = config.is_some(), "updating speech config");
        self.transport.set_speech_config(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parlance_core::error::ConversationError;
    use parlance_core::transport::EventListener;
    use parlance_test_support::{FixedClock, RecordingTransport};

    use crate::application::queue::EventHandler;
    use crate::domain::messages::StoredMessage;
    use crate::domain::state::ConversationState;
    use crate::test_support::RecordingHandler;

    struct Idle;

    #[async_trait]
    impl EventHandler<MessageEvent> for Idle {
        async fn handle(&self, _event: MessageEvent) -> Result<(), ConversationError> {
            Ok(())
        }
    }

    struct Fixture {
        dispatcher: CommandDispatcher,
        store: Arc<StateStore>,
        transport: Arc<RecordingTransport>,
        handler: Arc<RecordingHandler>,
        closed: Arc<AtomicBool>,
    }

    fn fixture_with(
        transport: Arc<dyn ConversationTransport>,
        recording: Arc<RecordingTransport>,
        send_intermediate_events: bool,
    ) -> Fixture {
        let handler = Arc::new(RecordingHandler::default());
        let cell: Arc<Latest<dyn ConversationHandler>> =
            Arc::new(Latest::new(handler.clone() as Arc<dyn ConversationHandler>));
        let store = Arc::new(StateStore::new(ConversationState::default(), cell.clone()));
        let idle: Arc<dyn EventHandler<MessageEvent>> = Arc::new(Idle);
        let queue = Arc::new(EventQueue::new(idle, None));
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));
        let closed = Arc::new(AtomicBool::new(false));
        let dispatcher = CommandDispatcher::new(
            transport,
            store.clone(),
            queue,
            cell,
            clock,
            send_intermediate_events,
            closed.clone(),
        );
        Fixture {
            dispatcher,
            store,
            transport: recording,
            handler,
            closed,
        }
    }

    fn fixture(send_intermediate_events: bool) -> Fixture {
        let transport = Arc::new(RecordingTransport::new());
        fixture_with(transport.clone(), transport, send_intermediate_events)
    }

    #[tokio::test]
    async fn test_reply_echoes_player_message_and_forwards_text() {
        // Arrange
        let fx = fixture(false);
        fx.dispatcher.type_text("hello".to_owned());

        // Act
        fx.dispatcher.reply(ReplyEvent {
            text: "hello".to_owned(),
        });

        // Assert
        let state = fx.store.state();
        assert_eq!(state.messages.len(), 1);
        match &state.messages[0] {
            StoredMessage::Player(player) => {
                assert_eq!(player.message.text, "hello");
                assert_eq!(
                    player.timestamp,
                    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0)
                        .unwrap()
                        .timestamp_millis()
                );
            }
            other => panic!("expected Player, got {other:?}"),
        }
        assert_eq!(state.input_value, "");
        assert_eq!(
            fx.transport.commands(),
            vec![ConversationCommand::Reply(ReplyEvent {
                text: "hello".to_owned()
            })]
        );
        assert_eq!(fx.handler.calls(), vec!["state:0", "reply:hello", "state:1"]);
    }

    /// Captures the history length at the moment `reply` reaches the transport.
    struct ProbeTransport {
        inner: Arc<RecordingTransport>,
        store: Mutex<Option<Arc<StateStore>>>,
        seen_len: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl ConversationTransport for ProbeTransport {
        fn subscribe(&self, listener: Arc<dyn EventListener>) {
            self.inner.subscribe(listener);
        }
        fn start(&self, event: &StartEvent) {
            self.inner.start(event);
        }
        fn reply(&self, event: &ReplyEvent) {
            let len = self
                .store
                .lock()
                .unwrap()
                .as_ref()
                .map(|store| store.state().messages.len());
            *self.seen_len.lock().unwrap() = len;
            self.inner.reply(event);
        }
        fn reply_intermediate(&self, event: &ReplyIntermediateEvent) {
            self.inner.reply_intermediate(event);
        }
        fn tap(&self) {
            self.inner.tap();
        }
        fn action(&self, event: &ActionEvent) {
            self.inner.action(event);
        }
        fn resume(&self) {
            self.inner.resume();
        }
        fn set_speech_config(&self, config: Option<&SpeechConfig>) {
            self.inner.set_speech_config(config);
        }
        async fn restart_from_event_id(&self, event_id: &str) -> Result<(), ConversationError> {
            self.inner.restart_from_event_id(event_id).await
        }
    }

    #[tokio::test]
    async fn test_reply_echo_is_visible_before_transport_send() {
        // Arrange
        let recording = Arc::new(RecordingTransport::new());
        let probe = Arc::new(ProbeTransport {
            inner: recording.clone(),
            store: Mutex::new(None),
            seen_len: Mutex::new(None),
        });
        let fx = fixture_with(probe.clone(), recording, false);
        *probe.store.lock().unwrap() = Some(fx.store.clone());

        // Act
        fx.dispatcher.reply(ReplyEvent {
            text: "hello".to_owned(),
        });

        // Assert
        assert_eq!(*probe.seen_len.lock().unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_start_clears_history_then_sends() {
        // Arrange
        let fx = fixture(false);
        fx.dispatcher.reply(ReplyEvent {
            text: "earlier".to_owned(),
        });
        let event = StartEvent {
            start_graph_reference_id: Some("intro".to_owned()),
            ..StartEvent::default()
        };

        // Act
        fx.dispatcher.start(event.clone());

        // Assert
        assert!(fx.store.state().messages.is_empty());
        assert_eq!(
            fx.transport.commands().last(),
            Some(&ConversationCommand::Start(event))
        );
        assert!(fx.handler.calls().contains(&"start".to_owned()));
    }

    #[tokio::test]
    async fn test_tap_action_resume_forward_without_touching_history() {
        // Arrange
        let fx = fixture(false);
        let action = ActionEvent {
            action: "open-door".to_owned(),
        };

        // Act
        fx.dispatcher.tap();
        fx.dispatcher.action(action.clone());
        fx.dispatcher.resume();

        // Assert
        assert!(fx.store.state().messages.is_empty());
        assert_eq!(
            fx.transport.commands(),
            vec![
                ConversationCommand::Tap,
                ConversationCommand::Action(action),
                ConversationCommand::Resume,
            ]
        );
        assert_eq!(fx.handler.calls(), vec!["tap", "action:open-door", "resume"]);
    }

    #[tokio::test]
    async fn test_type_streams_intermediate_reply_when_enabled() {
        // Arrange
        let fx = fixture(true);

        // Act
        fx.dispatcher.type_text("hel".to_owned());

        // Assert
        assert_eq!(fx.store.state().input_value, "hel");
        assert_eq!(
            fx.transport.commands(),
            vec![ConversationCommand::ReplyIntermediate(ReplyIntermediateEvent {
                text: "hel".to_owned(),
                input_type: InputType::Keyboard,
            })]
        );
    }

    #[tokio::test]
    async fn test_type_stays_local_when_intermediate_events_disabled() {
        let fx = fixture(false);

        fx.dispatcher.type_text("hel".to_owned());

        assert_eq!(fx.store.state().input_value, "hel");
        assert!(fx.transport.commands().is_empty());
    }

    #[tokio::test]
    async fn test_closed_dispatcher_sends_nothing() {
        // Arrange
        let fx = fixture(false);
        fx.closed.store(true, Ordering::Release);

        // Act
        fx.dispatcher.reply(ReplyEvent {
            text: "late".to_owned(),
        });
        fx.dispatcher.tap();

        // Assert
        assert!(fx.transport.commands().is_empty());
        assert!(fx.store.state().messages.is_empty());
    }
}
