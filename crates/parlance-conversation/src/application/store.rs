//! Owner of the conversation state.
//!
//! The store is the only writer of [`ConversationState`]. Every transition
//! goes through [`StateStore::dispatch`], which runs the pure reducer,
//! publishes the new read model, and notifies the consumer's state hook.
//! Hook calls are delivered one at a time, in transition order, even when
//! transitions race on different threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use super::handler::ConversationHandler;
use super::latest::Latest;
use super::view::ConversationView;
use crate::domain::state::{ConversationAction, ConversationState, reduce};

/// Message counts before and after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// History length before the transition.
    pub previous_len: usize,
    /// History length after the transition.
    pub len: usize,
}

impl Applied {
    /// Number of messages the transition removed.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.previous_len.saturating_sub(self.len)
    }
}

/// Holds the state, the restart flag, and the read-model channel.
pub struct StateStore {
    /// Taken before `state` and held across the state hook.
    delivery: Mutex<()>,
    state: Mutex<ConversationState>,
    restarting: AtomicBool,
    views: watch::Sender<ConversationView>,
    handler: Arc<Latest<dyn ConversationHandler>>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &*self.lock())
            .field("restarting", &self.is_restarting())
            .finish_non_exhaustive()
    }
}

impl StateStore {
    /// Creates a store seeded with `initial`.
    #[must_use]
    pub fn new(initial: ConversationState, handler: Arc<Latest<dyn ConversationHandler>>) -> Self {
        let (views, _) = watch::channel(ConversationView::new(Arc::new(initial.clone()), false));
        Self {
            delivery: Mutex::new(()),
            state: Mutex::new(initial),
            restarting: AtomicBool::new(false),
            views,
            handler,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `action` and notifies observers.
    ///
    /// The state hook runs after the state lock is released, so it may read
    /// the store again. Transitions wait for the previous hook call to
    /// return, so the hook must not dispatch.
    pub fn dispatch(&self, action: ConversationAction) -> Applied {
        let action_type = action.action_type();
        let _delivery = self
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (applied, snapshot) = {
            let mut guard = self.lock();
            let previous_len = guard.messages.len();
            *guard = reduce(std::mem::take(&mut *guard), action);
            let applied = Applied {
                previous_len,
                len: guard.messages.len(),
            };
            let snapshot = Arc::new(guard.clone());
            self.views.send_replace(ConversationView::new(
                Arc::clone(&snapshot),
                self.is_restarting(),
            ));
            (applied, snapshot)
        };
        debug!(
            action = action_type,
            previous_len = applied.previous_len,
            len = applied.len,
            "state transition applied"
        );
        self.handler.get().on_state_change(&snapshot);
        applied
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> ConversationState {
        self.lock().clone()
    }

    /// Returns the current read model.
    #[must_use]
    pub fn view(&self) -> ConversationView {
        self.views.borrow().clone()
    }

    /// Subscribes to read-model updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConversationView> {
        self.views.subscribe()
    }

    /// Whether a restart is in flight.
    #[must_use]
    pub fn is_restarting(&self) -> bool {
        self.restarting.load(Ordering::Acquire)
    }

    /// Sets the restart flag if it is clear. Returns a guard that clears it
    /// again when dropped, or `None` if a restart is already in flight.
    #[must_use]
    pub fn try_begin_restart(self: &Arc<Self>) -> Option<RestartGuard> {
        self.restarting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.publish_view();
        Some(RestartGuard {
            store: Arc::clone(self),
        })
    }

    /// Republishes the current snapshot with the current restart flag.
    fn publish_view(&self) {
        let _guard = self.lock();
        let is_restarting = self.is_restarting();
        self.views.send_modify(|view| view.is_restarting = is_restarting);
    }
}

/// Clears the restart flag when dropped, on success and failure alike.
#[derive(Debug)]
pub struct RestartGuard {
    store: Arc<StateStore>,
}

impl Drop for RestartGuard {
    fn drop(&mut self) {
        self.store.restarting.store(false, Ordering::Release);
        self.store.publish_view();
    }
}
