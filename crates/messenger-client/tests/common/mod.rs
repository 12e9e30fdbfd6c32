#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;
use tokio::sync::mpsc;

use messenger_client::validation::RegisterForm;
use messenger_client::{ClientConfig, MessengerClient, PanelEvent};
use messenger_service::LocalBackend;
use messenger_types::api::NewMessage;
use messenger_types::events::ChangeEvent;
use messenger_types::store::DocumentStore;
use messenger_types::{
    ConversationKey, Document, Fields, MessageCursor, MessageId, StoreError, StoreResult, UserId,
    UserProfile,
};

/// Delegates to the backend, counting message page queries. Page queries and
/// live-tail subscriptions can be made to fail a given number of times.
pub struct CountingStore {
    pub inner: Arc<LocalBackend>,
    pub page_queries: AtomicUsize,
    failing_pages: AtomicUsize,
    failing_subscriptions: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<LocalBackend>) -> Self {
        Self {
            inner,
            page_queries: AtomicUsize::new(0),
            failing_pages: AtomicUsize::new(0),
            failing_subscriptions: AtomicUsize::new(0),
        }
    }

    pub fn page_queries(&self) -> usize {
        self.page_queries.load(Ordering::SeqCst)
    }

    /// Fail the next `n` page queries.
    pub fn fail_pages(&self, n: usize) {
        self.failing_pages.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` `subscribe_latest` calls.
    pub fn fail_subscriptions(&self, n: usize) {
        self.failing_subscriptions.store(n, Ordering::SeqCst);
    }
}

/// Use up one scheduled failure, if any are left.
fn take_failure(remaining: &AtomicUsize) -> StoreResult<()> {
    match remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)) {
        Ok(_) => Err(StoreError::Unavailable("connection reset".into())),
        Err(_) => Ok(()),
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get_profile(&self, id: &UserId) -> StoreResult<Option<Document>> {
        self.inner.get_profile(id).await
    }

    async fn put_profile(&self, id: &UserId, fields: Fields) -> StoreResult<()> {
        self.inner.put_profile(id, fields).await
    }

    async fn update_profile(&self, id: &UserId, fields: Fields) -> StoreResult<()> {
        self.inner.update_profile(id, fields).await
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Document>> {
        self.inner.list_profiles().await
    }

    async fn find_profiles(&self, field: &str, value: &Value) -> StoreResult<Vec<Document>> {
        self.inner.find_profiles(field, value).await
    }

    async fn subscribe_profiles(&self) -> StoreResult<BoxStream<'static, Document>> {
        self.inner.subscribe_profiles().await
    }

    async fn append_message(
        &self,
        key: &ConversationKey,
        message: NewMessage,
    ) -> StoreResult<MessageId> {
        self.inner.append_message(key, message).await
    }

    async fn query_messages(
        &self,
        key: &ConversationKey,
        limit: usize,
        before: Option<&MessageCursor>,
    ) -> StoreResult<Vec<Document>> {
        self.page_queries.fetch_add(1, Ordering::SeqCst);
        take_failure(&self.failing_pages)?;
        self.inner.query_messages(key, limit, before).await
    }

    async fn subscribe_latest(
        &self,
        key: &ConversationKey,
    ) -> StoreResult<BoxStream<'static, ChangeEvent>> {
        take_failure(&self.failing_subscriptions)?;
        self.inner.subscribe_latest(key).await
    }

    async fn set_typing_flag(
        &self,
        key: &ConversationKey,
        user: &UserId,
        typing: bool,
    ) -> StoreResult<()> {
        self.inner.set_typing_flag(key, user, typing).await
    }

    async fn subscribe_typing(
        &self,
        key: &ConversationKey,
    ) -> StoreResult<BoxStream<'static, Document>> {
        self.inner.subscribe_typing(key).await
    }
}

pub fn backend() -> Arc<LocalBackend> {
    Arc::new(LocalBackend::in_memory("test-secret").unwrap())
}

pub fn client(backend: &Arc<LocalBackend>) -> (MessengerClient, mpsc::UnboundedReceiver<PanelEvent>) {
    MessengerClient::new(backend.clone(), backend.clone(), ClientConfig::default())
}

pub fn counting_client(
    backend: &Arc<LocalBackend>,
) -> (MessengerClient, mpsc::UnboundedReceiver<PanelEvent>, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::new(backend.clone()));
    let (client, events) = MessengerClient::new(backend.clone(), store.clone(), ClientConfig::default());
    (client, events, store)
}

pub fn registration(username: &str) -> RegisterForm {
    RegisterForm {
        username: username.into(),
        email: format!("{username}@example.com"),
        password: "secret1".into(),
        confirm_password: "secret1".into(),
    }
}

/// Register `username` through a throwaway client and return their profile.
pub async fn register(backend: &Arc<LocalBackend>, username: &str) -> UserProfile {
    let (client, _) = client(backend);
    client.identity.register(&registration(username)).await.unwrap()
}

/// Append `count` messages from `from` to `to`, numbered from 0.
pub async fn seed(backend: &LocalBackend, from: &UserProfile, to: &UserProfile, count: usize) {
    let key = ConversationKey::derive(&from.id, &to.id);
    for i in 0..count {
        let message = NewMessage {
            sender_id: from.id.clone(),
            receiver_id: to.id.clone(),
            text: format!("m{i}"),
            time_label: "10:00".into(),
        };
        backend.append_message(&key, message).await.unwrap();
    }
}

/// Wait for the first event matching `want`, skipping others.
pub async fn wait_for(
    events: &mut mpsc::UnboundedReceiver<PanelEvent>,
    want: impl Fn(&PanelEvent) -> bool,
) -> PanelEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Some(event) if want(&event) => return event,
                Some(_) => continue,
                None => panic!("panel event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for panel event")
}

/// Poll `check` until it holds.
pub async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never held")
}
