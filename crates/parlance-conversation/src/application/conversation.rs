//! The conversation facade.
//!
//! [`Conversation`] joins a conversation on a [`Playthrough`], wires the
//! event router, queue, store, dispatcher and restart handler together, and
//! exposes them as one handle. Dropping the handle leaves the conversation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parlance_core::clock::{Clock, SystemClock};
use parlance_core::command::{
    ActionEvent, ReplyEvent, ReplyIntermediateEvent, SpeechConfig, StartEvent,
};
use parlance_core::error::ConversationError;
use parlance_core::event::MessageEvent;
use parlance_core::transport::{EventListener, Playthrough};
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use super::dispatcher::CommandDispatcher;
use super::handler::ConversationHandler;
use super::latest::Latest;
use super::options::ConversationOptions;
use super::queue::{EventHandler, EventQueue};
use super::restart::{RestartHandler, RestartOutcome};
use super::router::{ConnectActions, EventRouter, NarrativeTask};
use super::store::StateStore;
use super::view::ConversationView;
use crate::domain::state::ConversationState;

/// A joined conversation.
pub struct Conversation {
    uuid: Uuid,
    playthrough: Arc<dyn Playthrough>,
    store: Arc<StateStore>,
    queue: Arc<EventQueue<MessageEvent>>,
    handler: Arc<Latest<dyn ConversationHandler>>,
    dispatcher: Arc<CommandDispatcher>,
    restart: RestartHandler,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("uuid", &self.uuid)
            .field("closed", &self.closed.load(Ordering::Acquire))
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl Conversation {
    /// Joins `conversation_uuid` on `playthrough`.
    ///
    /// # Errors
    ///
    /// Returns the playthrough's error if the conversation cannot be joined.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn join(
        playthrough: Arc<dyn Playthrough>,
        conversation_uuid: Uuid,
        options: ConversationOptions,
        handler: Arc<dyn ConversationHandler>,
    ) -> Result<Self, ConversationError> {
        Self::join_with_clock(
            playthrough,
            conversation_uuid,
            options,
            handler,
            Arc::new(SystemClock),
        )
    }

    /// Like [`Conversation::join`], with the clock used for player echoes.
    ///
    /// # Errors
    ///
    /// Returns the playthrough's error if the conversation cannot be joined.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn join_with_clock(
        playthrough: Arc<dyn Playthrough>,
        conversation_uuid: Uuid,
        options: ConversationOptions,
        handler: Arc<dyn ConversationHandler>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConversationError> {
        let transport = playthrough.join_conversation(conversation_uuid)?;

        let task_timeout = options.task_timeout();
        let ConversationOptions {
            should_resume_on_connect,
            should_start_on_connect,
            speech_config,
            send_intermediate_events,
            initial_state,
            reset_queue_on_restart,
            task_timeout_ms: _,
        } = options;

        let handler = Arc::new(Latest::new(handler));
        let store = Arc::new(StateStore::new(
            initial_state.unwrap_or_default(),
            Arc::clone(&handler),
        ));
        let task: Arc<dyn EventHandler<MessageEvent>> = Arc::new(NarrativeTask::new(
            Arc::clone(&store),
            Arc::clone(&handler),
        ));
        let queue = Arc::new(EventQueue::new(task, task_timeout));
        let closed = Arc::new(AtomicBool::new(false));
        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&handler),
            clock,
            send_intermediate_events,
            Arc::clone(&closed),
        ));
        let restart = RestartHandler::new(
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&queue),
            reset_queue_on_restart,
            Arc::clone(&closed),
        );
        let router: Arc<dyn EventListener> = Arc::new(EventRouter::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&handler),
            &dispatcher,
            ConnectActions {
                resume: should_resume_on_connect,
                start: should_start_on_connect,
            },
            Arc::clone(&closed),
        ));
        transport.subscribe(router);
        dispatcher.set_speech_config(speech_config.as_ref());

        info!(
            %conversation_uuid,
            messages = store.state().messages.len(),
            "joined conversation"
        );
        Ok(Self {
            uuid: conversation_uuid,
            playthrough,
            store,
            queue,
            handler,
            dispatcher,
            restart,
            closed,
        })
    }

    /// The joined conversation's identifier.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Current read model.
    #[must_use]
    pub fn view(&self) -> ConversationView {
        self.store.view()
    }

    /// Snapshot of the current state, suitable for persisting.
    #[must_use]
    pub fn state(&self) -> ConversationState {
        self.store.state()
    }

    /// Receives every new read model.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConversationView> {
        self.store.subscribe()
    }

    /// Whether a restart is in flight.
    #[must_use]
    pub fn is_restarting(&self) -> bool {
        self.store.is_restarting()
    }

    /// Replaces the consumer handler. Queued and future events use the new
    /// handler; a task already running finishes with the old one.
    pub fn set_handler(&self, handler: Arc<dyn ConversationHandler>) {
        self.handler.replace(handler);
    }

    /// Pushes new speech settings to the transport.
    pub fn set_speech_config(&self, config: Option<&SpeechConfig>) {
        self.dispatcher.set_speech_config(config);
    }

    /// Updates the player's input box.
    pub fn type_text(&self, text: impl Into<String>) {
        self.dispatcher.type_text(text.into());
    }

    /// Clears history and starts the conversation.
    pub fn start(&self, event: StartEvent) {
        self.dispatcher.start(event);
    }

    /// Sends a player reply, echoing it into history first.
    pub fn reply(&self, event: ReplyEvent) {
        self.dispatcher.reply(event);
    }

    /// Streams interim player input.
    pub fn reply_intermediate(&self, event: ReplyIntermediateEvent) {
        self.dispatcher.reply_intermediate(event);
    }

    /// Advances a tap-to-continue beat.
    pub fn tap(&self) {
        self.dispatcher.tap();
    }

    /// Sends a structured action.
    pub fn action(&self, event: ActionEvent) {
        self.dispatcher.action(event);
    }

    /// Resumes the session without clearing history.
    pub fn resume(&self) {
        self.dispatcher.resume();
    }

    /// Rewinds to just before the narrative event `event_id`.
    ///
    /// # Errors
    ///
    /// See [`RestartHandler::restart`].
    pub async fn restart(&self, event_id: &str) -> Result<RestartOutcome, ConversationError> {
        self.restart.restart(event_id).await
    }

    /// Waits until every narrative event queued so far has been applied.
    pub async fn wait_idle(&self) {
        self.queue.drain().await;
    }

    /// Narrative events waiting to be applied.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.pending()
    }

    /// Leaves the conversation. Later events are ignored and commands become
    /// no-ops. Calling it again does nothing.
    pub fn leave(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.queue.close();
        self.playthrough.leave_conversation(self.uuid);
        info!(conversation_uuid = %self.uuid, "left conversation");
    }
}

impl Drop for Conversation {
    fn drop(&mut self) {
        self.leave();
    }
}
