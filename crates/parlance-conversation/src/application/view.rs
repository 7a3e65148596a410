//! Read model exposed to user interfaces.

use std::ops::Deref;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::domain::state::ConversationState;

/// Everything a UI needs to render a conversation.
///
/// Dereferences to the [`ConversationState`] snapshot, so `view.messages`
/// and `view.mode` read the state directly. The snapshot is shared with the
/// state hook, not copied per subscriber.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationView {
    state: Arc<ConversationState>,
    /// Whether a rewind is in flight.
    pub is_restarting: bool,
}

impl ConversationView {
    /// Builds a view from a shared state snapshot and the restart flag.
    #[must_use]
    pub fn new(state: Arc<ConversationState>, is_restarting: bool) -> Self {
        Self {
            state,
            is_restarting,
        }
    }

    /// The state snapshot this view renders.
    #[must_use]
    pub fn state(&self) -> &ConversationState {
        &self.state
    }
}

impl Deref for ConversationView {
    type Target = ConversationState;

    fn deref(&self) -> &ConversationState {
        &self.state
    }
}

/// Serializes as the state's fields plus `isRestarting`.
impl Serialize for ConversationView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Flat<'a> {
            #[serde(flatten)]
            state: &'a ConversationState,
            is_restarting: bool,
        }

        Flat {
            state: &self.state,
            is_restarting: self.is_restarting,
        }
        .serialize(serializer)
    }
}
