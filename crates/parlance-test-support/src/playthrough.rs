//! Test playthrough — hands out recording transports per conversation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parlance_core::error::ConversationError;
use parlance_core::transport::{ConversationTransport, Playthrough};
use uuid::Uuid;

use crate::transport::RecordingTransport;

/// A playthrough that records joins and leaves. Each joined conversation gets
/// its own [`RecordingTransport`], built by the configured factory.
pub struct RecordingPlaythrough {
    factory: Box<dyn Fn() -> RecordingTransport + Send + Sync>,
    transports: Mutex<HashMap<Uuid, Arc<RecordingTransport>>>,
    joined: Mutex<Vec<Uuid>>,
    left: Mutex<Vec<Uuid>>,
    refuse_joins: bool,
}

impl std::fmt::Debug for RecordingPlaythrough {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingPlaythrough")
            .field("joined", &self.joined())
            .field("left", &self.left())
            .finish_non_exhaustive()
    }
}

impl Default for RecordingPlaythrough {
    fn default() -> Self {
        Self::with_transports(RecordingTransport::new)
    }
}

impl RecordingPlaythrough {
    /// Creates a playthrough whose transports accept every restart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a playthrough that builds transports with `factory`.
    #[must_use]
    pub fn with_transports(
        factory: impl Fn() -> RecordingTransport + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            transports: Mutex::new(HashMap::new()),
            joined: Mutex::new(Vec::new()),
            left: Mutex::new(Vec::new()),
            refuse_joins: false,
        }
    }

    /// Creates a playthrough that rejects every join.
    #[must_use]
    pub fn refusing() -> Self {
        Self {
            refuse_joins: true,
            ..Self::default()
        }
    }

    /// Returns the transport of a joined conversation.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn transport(&self, conversation_uuid: Uuid) -> Option<Arc<RecordingTransport>> {
        self.transports
            .lock()
            .unwrap()
            .get(&conversation_uuid)
            .cloned()
    }

    /// Conversations joined so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn joined(&self) -> Vec<Uuid> {
        self.joined.lock().unwrap().clone()
    }

    /// Conversations left so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn left(&self) -> Vec<Uuid> {
        self.left.lock().unwrap().clone()
    }
}

impl Playthrough for RecordingPlaythrough {
    fn join_conversation(
        &self,
        conversation_uuid: Uuid,
    ) -> Result<Arc<dyn ConversationTransport>, ConversationError> {
        if self.refuse_joins {
            return Err(ConversationError::Transport(format!(
                "cannot join conversation {conversation_uuid}"
            )));
        }
        let transport = Arc::new((self.factory)());
        self.transports
            .lock()
            .unwrap()
            .insert(conversation_uuid, Arc::clone(&transport));
        self.joined.lock().unwrap().push(conversation_uuid);
        Ok(transport)
    }

    fn leave_conversation(&self, conversation_uuid: Uuid) {
        if let Some(transport) = self.transport(conversation_uuid) {
            transport.clear_listeners();
        }
        self.left.lock().unwrap().push(conversation_uuid);
    }
}
