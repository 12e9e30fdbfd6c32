use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::models::ConversationKey;

/// Change notifications published by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StoreEvent {
    /// A message was appended to a conversation
    MessageAdded {
        conversation: ConversationKey,
        doc: Document,
    },

    /// A conversation's typing document changed; `doc` is the full snapshot
    TypingChanged {
        conversation: ConversationKey,
        doc: Document,
    },

    /// A profile was created or updated; `doc` is the full snapshot
    ProfileChanged { doc: Document },
}

impl StoreEvent {
    /// Returns the conversation if this event is scoped to one.
    /// Events that return `None` are global (profile changes).
    pub fn conversation(&self) -> Option<&ConversationKey> {
        match self {
            Self::MessageAdded { conversation, .. } => Some(conversation),
            Self::TypingChanged { conversation, .. } => Some(conversation),
            Self::ProfileChanged { .. } => None,
        }
    }
}

/// Item of a live query subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "doc", rename_all = "lowercase")]
pub enum ChangeEvent {
    Added(Document),
}
