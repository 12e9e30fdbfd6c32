use std::sync::Arc;

use futures_util::stream::BoxStream;
use tokio::sync::broadcast;
use tracing::trace;

use messenger_types::events::{ChangeEvent, StoreEvent};
use messenger_types::{ConversationKey, Document};

use crate::subscription;

const DEFAULT_CAPACITY: usize = 1024;

/// Fans store events out to every live subscription.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for store events; every subscriber sees every event
    /// and filters for the scope it asked for
    broadcast_tx: broadcast::Sender<StoreEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may fall behind before it
    /// starts skipping events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to all store events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn broadcast(&self, event: StoreEvent) {
        trace!(conversation = ?event.conversation(), "broadcast store event");
        let _ = self.inner.broadcast_tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }

    /// Messages appended to `key`, preceded by `latest` if the caller already
    /// read one. Call this *before* reading `latest` so nothing falls in between.
    pub fn message_stream(
        &self,
        receiver: broadcast::Receiver<StoreEvent>,
        key: ConversationKey,
        latest: Option<Document>,
    ) -> BoxStream<'static, ChangeEvent> {
        let initial = latest.into_iter().map(ChangeEvent::Added).collect();
        subscription::filtered(receiver, initial, move |event| match event {
            StoreEvent::MessageAdded { conversation, doc } if conversation == key => {
                Some(ChangeEvent::Added(doc))
            }
            _ => None,
        })
    }

    /// Typing-document snapshots for `key`, starting with `current`.
    pub fn typing_stream(
        &self,
        receiver: broadcast::Receiver<StoreEvent>,
        key: ConversationKey,
        current: Document,
    ) -> BoxStream<'static, Document> {
        subscription::filtered(receiver, vec![current], move |event| match event {
            StoreEvent::TypingChanged { conversation, doc } if conversation == key => Some(doc),
            _ => None,
        })
    }

    /// Profile documents as they are written.
    pub fn profile_stream(&self) -> BoxStream<'static, Document> {
        subscription::filtered(self.subscribe(), Vec::new(), |event| match event {
            StoreEvent::ProfileChanged { doc } => Some(doc),
            _ => None,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
