//! Routing of transport events.
//!
//! Narrative messages go through the event queue so they are applied one at
//! a time. Every other event is handled immediately, in delivery order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parlance_core::command::{ConversationCommand, StartEvent};
use parlance_core::error::ConversationError;
use parlance_core::event::{ConnectionStatus, ConversationEvent, MessageEvent};
use parlance_core::transport::EventListener;
use tracing::{debug, info, warn};

use super::dispatcher::CommandDispatcher;
use super::handler::ConversationHandler;
use super::latest::Latest;
use super::queue::{EventHandler, EventQueue};
use super::store::StateStore;
use crate::domain::state::ConversationAction;

/// Queued work for one narrative message: append it to history, then let the
/// consumer react and wait for it.
pub struct NarrativeTask {
    store: Arc<StateStore>,
    handler: Arc<Latest<dyn ConversationHandler>>,
}

impl std::fmt::Debug for NarrativeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeTask").finish_non_exhaustive()
    }
}

impl NarrativeTask {
    /// Creates the task body shared by every queued message.
    #[must_use]
    pub fn new(store: Arc<StateStore>, handler: Arc<Latest<dyn ConversationHandler>>) -> Self {
        Self { store, handler }
    }
}

#[async_trait]
impl EventHandler<MessageEvent> for NarrativeTask {
    async fn handle(&self, event: MessageEvent) -> Result<(), ConversationError> {
        self.store.dispatch(ConversationAction::MessageCharacter(event.clone()));
        self.handler.get().on_message(&event).await
    }
}

/// What to send automatically the first time the connection is ready.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectActions {
    /// Send `resume`.
    pub resume: bool,
    /// Send `start` with this payload.
    pub start: Option<StartEvent>,
}

/// Listener subscribed to the conversation transport.
///
/// The transport owns the router and the dispatcher owns the transport, so
/// the router only holds a weak reference to the dispatcher.
pub struct EventRouter {
    store: Arc<StateStore>,
    queue: Arc<EventQueue<MessageEvent>>,
    handler: Arc<Latest<dyn ConversationHandler>>,
    dispatcher: Weak<CommandDispatcher>,
    on_connect: ConnectActions,
    has_handled_connect: AtomicBool,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("on_connect", &self.on_connect)
            .field(
                "has_handled_connect",
                &self.has_handled_connect.load(Ordering::Acquire),
            )
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl EventRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(
        store: Arc<StateStore>,
        queue: Arc<EventQueue<MessageEvent>>,
        handler: Arc<Latest<dyn ConversationHandler>>,
        dispatcher: &Arc<CommandDispatcher>,
        on_connect: ConnectActions,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            queue,
            handler,
            dispatcher: Arc::downgrade(dispatcher),
            on_connect,
            has_handled_connect: AtomicBool::new(false),
            closed,
        }
    }

    fn on_connection_status(&self, status: ConnectionStatus) {
        info!(?status, "connection status changed");
        self.handler.get().on_connection_status(status);
        if status != ConnectionStatus::Connected
            || self.has_handled_connect.swap(true, Ordering::AcqRel)
        {
            return;
        }
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            debug!("conversation dropped; skipping connect commands");
            return;
        };
        if self.on_connect.resume {
            dispatcher.send(&ConversationCommand::Resume);
        }
        if let Some(start) = &self.on_connect.start {
            dispatcher.send(&ConversationCommand::Start(start.clone()));
        }
    }
}

impl EventListener for EventRouter {
    fn on_event(&self, event: ConversationEvent) {
        if self.closed.load(Ordering::Acquire) {
            debug!(event_type = event.event_type(), "conversation closed; ignoring event");
            return;
        }
        debug!(event_type = event.event_type(), "event received");
        match event {
            ConversationEvent::Message(message) => {
                self.queue.enqueue(message);
            }
            ConversationEvent::StartTyping => {
                self.store.dispatch(ConversationAction::StartTyping);
                self.handler.get().on_start_typing();
            }
            ConversationEvent::StopTyping => {
                self.store.dispatch(ConversationAction::StopTyping);
                self.handler.get().on_stop_typing();
            }
            ConversationEvent::EpisodeComplete(episode) => {
                info!(episode_id = ?episode.episode_id, "episode complete");
                self.handler.get().on_episode_complete(&episode);
            }
            ConversationEvent::Problem(problem) => {
                warn!(code = %problem.code, error = %problem.error, "engine reported a problem");
                self.handler.get().on_problem(&problem);
            }
            ConversationEvent::PlaybackStart => self.handler.get().on_playback_start(),
            ConversationEvent::PlaybackStop => self.handler.get().on_playback_stop(),
            ConversationEvent::ConnectionStatus(status) => self.on_connection_status(status),
            echo => {
                if let Some(command) = echo.confirmed_command() {
                    self.handler.get().on_confirmed(&command);
                }
            }
        }
    }
}
