use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use messenger_types::store::DocumentStore;
use messenger_types::{ConversationKey, UserId};

use crate::error::ClientResult;

/// Publishes the local user's typing flag for one conversation at a time.
///
/// An edit raises the flag and (re)arms an inactivity timer; the timer, a blur
/// or a switch to another conversation lowers it. Only a false to true
/// transition writes `true`, so a burst of keystrokes costs one write.
pub struct TypingDebouncer {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn DocumentStore>,
    timeout: Duration,
    state: Mutex<LocalTyping>,
}

#[derive(Default)]
struct LocalTyping {
    target: Option<(ConversationKey, UserId)>,
    active: bool,
    /// Bumped on every edit and clear; a timer only fires for the generation
    /// that armed it.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl LocalTyping {
    /// Disarm the timer and lower the flag, returning where it was raised.
    fn reset(&mut self) -> Option<(ConversationKey, UserId)> {
        self.generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let was_active = std::mem::replace(&mut self.active, false);
        if was_active { self.target.clone() } else { None }
    }
}

impl TypingDebouncer {
    pub fn new(store: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                timeout,
                state: Mutex::new(LocalTyping::default()),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    pub fn target(&self) -> Option<ConversationKey> {
        self.inner.lock().target.as_ref().map(|(key, _)| key.clone())
    }

    /// Point the debouncer at another conversation (or none), lowering the
    /// flag on the one being left.
    pub async fn attach(&self, target: Option<(ConversationKey, UserId)>) -> ClientResult<()> {
        let lowered = {
            let mut state = self.inner.lock();
            let lowered = state.reset();
            state.target = target;
            lowered
        };
        self.inner.lower(lowered).await
    }

    /// Record a local edit.
    pub async fn on_local_edit(&self) -> ClientResult<()> {
        let raise = {
            let mut state = self.inner.lock();
            let Some(target) = state.target.clone() else {
                return Ok(());
            };

            state.generation += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            let generation = state.generation;
            let weak = Arc::downgrade(&self.inner);
            let timeout = self.inner.timeout;
            state.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                expire(weak, generation).await;
            }));

            let was_active = std::mem::replace(&mut state.active, true);
            (!was_active).then_some(target)
        };

        let Some((key, user)) = raise else {
            return Ok(());
        };
        if let Err(e) = self.inner.store.set_typing_flag(&key, &user, true).await {
            warn!("Failed to publish typing flag for {}: {}", key, e);
            self.inner.lock().active = false;
            return Err(e.into());
        }
        Ok(())
    }

    /// Lower the flag right away (input lost focus, message sent).
    pub async fn blur(&self) -> ClientResult<()> {
        let lowered = self.inner.lock().reset();
        self.inner.lower(lowered).await
    }
}

impl Drop for TypingDebouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.inner.lock().timer.take() {
            timer.abort();
        }
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, LocalTyping> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn lower(&self, target: Option<(ConversationKey, UserId)>) -> ClientResult<()> {
        let Some((key, user)) = target else {
            return Ok(());
        };
        self.store
            .set_typing_flag(&key, &user, false)
            .await
            .inspect_err(|e| warn!("Failed to clear typing flag for {}: {}", key, e))?;
        Ok(())
    }
}

async fn expire(inner: Weak<Inner>, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };

    let lowered = {
        let mut state = inner.lock();
        if state.generation != generation || !state.active {
            return;
        }
        state.active = false;
        state.timer = None;
        state.target.clone()
    };

    debug!("Typing timed out");
    // Nobody is waiting on the timer; a failed write is only logged.
    let _ = inner.lower(lowered).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::stream::BoxStream;
    use messenger_types::api::NewMessage;
    use messenger_types::events::ChangeEvent;
    use messenger_types::{Document, Fields, MessageCursor, MessageId, StoreError, StoreResult};
    use serde_json::Value;

    /// Records typing writes; every other call fails.
    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<(String, String, bool)>>,
    }

    impl RecordingStore {
        fn writes(&self) -> Vec<(String, String, bool)> {
            self.writes.lock().unwrap().clone()
        }
    }

    fn unsupported<T>() -> StoreResult<T> {
        Err(StoreError::Unavailable("not supported".into()))
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn get_profile(&self, _: &UserId) -> StoreResult<Option<Document>> {
            unsupported()
        }
        async fn put_profile(&self, _: &UserId, _: Fields) -> StoreResult<()> {
            unsupported()
        }
        async fn update_profile(&self, _: &UserId, _: Fields) -> StoreResult<()> {
            unsupported()
        }
        async fn list_profiles(&self) -> StoreResult<Vec<Document>> {
            unsupported()
        }
        async fn find_profiles(&self, _: &str, _: &Value) -> StoreResult<Vec<Document>> {
            unsupported()
        }
        async fn subscribe_profiles(&self) -> StoreResult<BoxStream<'static, Document>> {
            unsupported()
        }
        async fn append_message(&self, _: &ConversationKey, _: NewMessage) -> StoreResult<MessageId> {
            unsupported()
        }
        async fn query_messages(
            &self,
            _: &ConversationKey,
            _: usize,
            _: Option<&MessageCursor>,
        ) -> StoreResult<Vec<Document>> {
            unsupported()
        }
        async fn subscribe_latest(&self, _: &ConversationKey) -> StoreResult<BoxStream<'static, ChangeEvent>> {
            unsupported()
        }
        async fn set_typing_flag(&self, key: &ConversationKey, user: &UserId, typing: bool) -> StoreResult<()> {
            self.writes
                .lock()
                .unwrap()
                .push((key.to_string(), user.to_string(), typing));
            Ok(())
        }
        async fn subscribe_typing(&self, _: &ConversationKey) -> StoreResult<BoxStream<'static, Document>> {
            unsupported()
        }
    }

    fn setup() -> (Arc<RecordingStore>, TypingDebouncer, ConversationKey, UserId) {
        let store = Arc::new(RecordingStore::default());
        let debouncer = TypingDebouncer::new(store.clone(), Duration::from_millis(1500));
        let me = UserId::new("u1").unwrap();
        let key = ConversationKey::derive(&me, &UserId::new("u2").unwrap());
        (store, debouncer, key, me)
    }

    fn write(key: &ConversationKey, typing: bool) -> (String, String, bool) {
        (key.to_string(), "u1".to_string(), typing)
    }

    #[tokio::test(start_paused = true)]
    async fn inactivity_lowers_the_flag_once() {
        let (store, debouncer, key, me) = setup();
        debouncer.attach(Some((key.clone(), me))).await.unwrap();

        debouncer.on_local_edit().await.unwrap();
        assert_eq!(store.writes(), vec![write(&key, true)]);

        // Each edit restarts the timer without writing again
        tokio::time::sleep(Duration::from_millis(1000)).await;
        debouncer.on_local_edit().await.unwrap();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(store.writes(), vec![write(&key, true)]);
        assert!(debouncer.is_active());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(store.writes(), vec![write(&key, true), write(&key, false)]);
        assert!(!debouncer.is_active());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn blur_clears_immediately() {
        let (store, debouncer, key, me) = setup();
        debouncer.attach(Some((key.clone(), me))).await.unwrap();

        debouncer.on_local_edit().await.unwrap();
        debouncer.blur().await.unwrap();
        assert_eq!(store.writes(), vec![write(&key, true), write(&key, false)]);

        // The aborted timer never fires
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.writes().len(), 2);

        // Blur with nothing raised writes nothing
        debouncer.blur().await.unwrap();
        assert_eq!(store.writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_lowers_the_flag_on_the_old_conversation() {
        let (store, debouncer, key, me) = setup();
        let next = ConversationKey::derive(&me, &UserId::new("u3").unwrap());
        debouncer.attach(Some((key.clone(), me.clone()))).await.unwrap();
        debouncer.on_local_edit().await.unwrap();

        debouncer.attach(Some((next.clone(), me))).await.unwrap();
        debouncer.on_local_edit().await.unwrap();

        assert_eq!(
            store.writes(),
            vec![write(&key, true), write(&key, false), write(&next, true)]
        );
        assert_eq!(debouncer.target(), Some(next));
    }

    #[tokio::test]
    async fn edits_without_a_conversation_are_ignored() {
        let (store, debouncer, _, _) = setup();
        debouncer.on_local_edit().await.unwrap();
        assert!(store.writes().is_empty());
        assert!(!debouncer.is_active());
    }
}
