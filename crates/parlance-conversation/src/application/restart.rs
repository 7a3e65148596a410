//! Rewind to an earlier narrative event.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parlance_core::error::ConversationError;
use parlance_core::event::MessageEvent;
use parlance_core::transport::ConversationTransport;
use tracing::{info, instrument, warn};

use super::queue::EventQueue;
use super::store::StateStore;
use crate::domain::state::ConversationAction;

/// Result of a restart the transport accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// History was truncated before the target event.
    Rewound {
        /// Number of messages removed from history.
        removed: usize,
    },
    /// The target event is not in history; local state is unchanged.
    UnknownEvent,
}

/// Coordinates the restart flag, the transport call, and the truncation.
pub struct RestartHandler {
    transport: Arc<dyn ConversationTransport>,
    store: Arc<StateStore>,
    queue: Arc<EventQueue<MessageEvent>>,
    reset_queue: bool,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for RestartHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestartHandler")
            .field("reset_queue", &self.reset_queue)
            .finish_non_exhaustive()
    }
}

impl RestartHandler {
    /// Creates a restart handler. With `reset_queue`, narrative events still
    /// queued when the restart is confirmed are discarded.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ConversationTransport>,
        store: Arc<StateStore>,
        queue: Arc<EventQueue<MessageEvent>>,
        reset_queue: bool,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            store,
            queue,
            reset_queue,
            closed,
        }
    }

    /// Asks the engine to resynchronize from just before `event_id`, then
    /// truncates local history to match.
    ///
    /// History is only touched once the transport confirms. The restart flag
    /// is cleared on every path out of this method.
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::Closed` after the conversation was left,
    /// `ConversationError::RestartInProgress` if another restart is in
    /// flight, or the transport's error if it rejects the request.
    #[instrument(skip(self))]
    pub async fn restart(&self, event_id: &str) -> Result<RestartOutcome, ConversationError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ConversationError::Closed);
        }
        let Some(_guard) = self.store.try_begin_restart() else {
            warn!("restart already in progress");
            return Err(ConversationError::RestartInProgress);
        };

        self.transport
            .restart_from_event_id(event_id)
            .await
            .inspect_err(|error| warn!(%error, "transport rejected restart"))?;

        let applied = self
            .store
            .dispatch(ConversationAction::Restart(event_id.to_owned()));
        if self.reset_queue {
            let discarded = self.queue.reset();
            info!(discarded, "restart discarded pending narrative events");
        }

        if applied.removed() == 0 {
            warn!("restart target not found in history; state unchanged");
            return Ok(RestartOutcome::UnknownEvent);
        }
        info!(removed = applied.removed(), "conversation rewound");
        Ok(RestartOutcome::Rewound {
            removed: applied.removed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use parlance_core::event::{MessageKind, NarrativeMessage};
    use parlance_test_support::RecordingTransport;
    use tokio::sync::Notify;

    use crate::application::handler::{ConversationHandler, NoopHandler};
    use crate::application::latest::Latest;
    use crate::application::queue::EventHandler;
    use crate::domain::state::ConversationState;

    struct Slow;

    #[async_trait]
    impl EventHandler<MessageEvent> for Slow {
        async fn handle(&self, _event: MessageEvent) -> Result<(), ConversationError> {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(())
        }
    }

    fn narrative(event_id: &str) -> MessageEvent {
        MessageEvent {
            kind: MessageKind::Character,
            event_id: event_id.to_owned(),
            tap_to_continue: false,
            end_story: false,
            timestamp: 0,
            message: NarrativeMessage {
                text: format!("line {event_id}"),
                ..NarrativeMessage::default()
            },
        }
    }

    struct Fixture {
        restart: Arc<RestartHandler>,
        store: Arc<StateStore>,
        queue: Arc<EventQueue<MessageEvent>>,
        transport: Arc<RecordingTransport>,
    }

    fn fixture(transport: RecordingTransport, reset_queue: bool) -> Fixture {
        let cell: Arc<Latest<dyn ConversationHandler>> =
            Arc::new(Latest::new(Arc::new(NoopHandler) as Arc<dyn ConversationHandler>));
        let store = Arc::new(StateStore::new(ConversationState::default(), cell));
        for id in ["A", "B", "C"] {
            store.dispatch(ConversationAction::MessageCharacter(narrative(id)));
        }
        let slow: Arc<dyn EventHandler<MessageEvent>> = Arc::new(Slow);
        let queue = Arc::new(EventQueue::new(slow, None));
        let transport = Arc::new(transport);
        let restart = Arc::new(RestartHandler::new(
            transport.clone(),
            store.clone(),
            queue.clone(),
            reset_queue,
            Arc::new(AtomicBool::new(false)),
        ));
        Fixture {
            restart,
            store,
            queue,
            transport,
        }
    }

    fn history(store: &StateStore) -> Vec<String> {
        store
            .state()
            .messages
            .iter()
            .filter_map(|stored| stored.event_id().map(str::to_owned))
            .collect()
    }

    #[tokio::test]
    async fn test_restart_truncates_after_transport_confirms() {
        // Arrange
        let fx = fixture(RecordingTransport::new(), false);

        // Act
        let outcome = fx.restart.restart("B").await.unwrap();

        // Assert
        assert_eq!(outcome, RestartOutcome::Rewound { removed: 2 });
        assert_eq!(history(&fx.store), vec!["A"]);
        assert_eq!(fx.transport.restarts(), vec!["B"]);
        assert!(!fx.store.is_restarting());
    }

    #[tokio::test]
    async fn test_failed_restart_keeps_history_and_clears_flag() {
        // Arrange
        let fx = fixture(RecordingTransport::failing_restarts("engine busy"), false);

        // Act
        let result = fx.restart.restart("B").await;

        // Assert
        assert!(
            matches!(result, Err(ConversationError::Transport(ref message)) if message == "engine busy")
        );
        assert_eq!(history(&fx.store), vec!["A", "B", "C"]);
        assert!(!fx.store.is_restarting());
        assert!(!fx.store.view().is_restarting);
    }

    #[tokio::test]
    async fn test_concurrent_restart_is_rejected() {
        // Arrange
        let gate = Arc::new(Notify::new());
        let fx = fixture(RecordingTransport::gated_restarts(gate.clone()), false);
        let first = {
            let restart = fx.restart.clone();
            tokio::spawn(async move { restart.restart("C").await })
        };
        while !fx.store.is_restarting() {
            tokio::task::yield_now().await;
        }

        // Act
        let second = fx.restart.restart("B").await;
        gate.notify_one();
        let first = first.await.unwrap();

        // Assert
        assert!(matches!(second, Err(ConversationError::RestartInProgress)));
        assert_eq!(first.unwrap(), RestartOutcome::Rewound { removed: 1 });
        assert_eq!(fx.transport.restarts(), vec!["C"]);
        assert_eq!(history(&fx.store), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_unknown_event_leaves_state_unchanged() {
        // Arrange
        let fx = fixture(RecordingTransport::new(), false);

        // Act
        let outcome = fx.restart.restart("Z").await.unwrap();

        // Assert
        assert_eq!(outcome, RestartOutcome::UnknownEvent);
        assert_eq!(history(&fx.store), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_restart_leaves_queue_alone_unless_configured() {
        // Arrange
        let kept = fixture(RecordingTransport::new(), false);
        let reset = fixture(RecordingTransport::new(), true);
        for fx in [&kept, &reset] {
            for id in ["D", "E", "F"] {
                fx.queue.enqueue(narrative(id));
            }
        }
        let kept_generation = kept.queue.generation();
        let reset_generation = reset.queue.generation();

        // Act
        kept.restart.restart("A").await.unwrap();
        reset.restart.restart("A").await.unwrap();

        // Assert
        assert_eq!(kept.queue.generation(), kept_generation);
        assert_ne!(reset.queue.generation(), reset_generation);
        assert_eq!(reset.queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_restart_after_close_is_rejected() {
        // Arrange
        let fx = fixture(RecordingTransport::new(), false);
        fx.restart.closed.store(true, Ordering::Release);

        // Act
        let result = fx.restart.restart("B").await;

        // Assert
        assert!(matches!(result, Err(ConversationError::Closed)));
        assert!(fx.transport.restarts().is_empty());
    }
}
