use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::Local;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use messenger_types::api::NewMessage;
use messenger_types::events::ChangeEvent;
use messenger_types::store::DocumentStore;
use messenger_types::{
    ConversationKey, Document, Message, MessageId, TypingState, UserId, UserProfile,
};

use crate::composer::Composer;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::Session;
use crate::typing::TypingDebouncer;
use crate::window::{MessageWindow, PageRequest};

/// Notifications for whoever renders the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    /// The loaded message list changed
    MessagesChanged,

    /// A new message arrived at the bottom
    ScrollToBottom,

    /// The other participant started or stopped typing
    RemoteTyping(bool),

    /// Something failed in the background
    Notice(String),
}

/// One open conversation at a time: its message window, live tail, remote
/// typing indicator, and the local composer.
pub struct ChatPanel {
    inner: Arc<PanelInner>,
}

struct PanelInner {
    store: Arc<dyn DocumentStore>,
    session: Arc<Session>,
    typing: TypingDebouncer,
    state: Mutex<PanelState>,
    composer: Mutex<Composer>,
    events: mpsc::UnboundedSender<PanelEvent>,
}

struct PanelState {
    window: MessageWindow,
    peer: Option<UserProfile>,
    remote_typing: bool,
    /// Stops the subscriptions of the open conversation
    subscriptions: Option<CancellationToken>,
}

impl ChatPanel {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session: Arc<Session>,
        config: &ClientConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PanelEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let inner = PanelInner {
            typing: TypingDebouncer::new(store.clone(), config.typing_timeout),
            store,
            session,
            state: Mutex::new(PanelState {
                window: MessageWindow::new(config.page_size),
                peer: None,
                remote_typing: false,
                subscriptions: None,
            }),
            composer: Mutex::new(Composer::new()),
            events,
        };
        (Self { inner: Arc::new(inner) }, rx)
    }

    // -- Snapshots --

    pub fn conversation(&self) -> Option<ConversationKey> {
        self.inner.state().window.key().cloned()
    }

    pub fn peer(&self) -> Option<UserProfile> {
        self.inner.state().peer.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.state().window.messages().to_vec()
    }

    pub fn is_exhausted(&self) -> bool {
        self.inner.state().window.is_exhausted()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state().window.is_loading()
    }

    pub fn remote_typing(&self) -> bool {
        self.inner.state().remote_typing
    }

    pub fn local_typing(&self) -> bool {
        self.inner.typing.is_active()
    }

    pub fn draft(&self) -> String {
        self.inner.composer().text().to_string()
    }

    // -- Conversation lifecycle --

    /// Switch to the conversation with `peer`: drop the previous one's
    /// subscriptions, load the newest page and follow new messages and the
    /// peer's typing flag.
    ///
    /// If subscribing fails the panel keeps showing what it showed before. If
    /// only the first page fails, opening the same peer again retries it.
    pub async fn open_conversation(&self, peer: UserProfile) -> ClientResult<()> {
        let me = self.inner.session.current_id().ok_or(ClientError::NotSignedIn)?;
        let key = ConversationKey::derive(&me, &peer.id);
        {
            let state = self.inner.state();
            let window = &state.window;
            if window.key() == Some(&key) && (window.is_loading() || window.has_first_page()) {
                return Ok(());
            }
        }

        info!("Opening conversation {} with {}", key, peer.display_name());

        // Subscribe before the first page so nothing appended in between is
        // missed; the window drops whatever both report.
        let latest = self.inner.store.subscribe_latest(&key).await?;
        let typing = self.inner.store.subscribe_typing(&key).await?;

        let left = self.inner.typing.attach(Some((key.clone(), me))).await;

        let cancel = CancellationToken::new();
        let request = {
            let mut state = self.inner.state();
            if let Some(previous) = state.subscriptions.replace(cancel.clone()) {
                previous.cancel();
            }
            state.peer = Some(peer.clone());
            state.remote_typing = false;
            state.window.reset(Some(key.clone()))
        };
        self.inner.emit(PanelEvent::MessagesChanged);
        self.inner.emit(PanelEvent::RemoteTyping(false));

        // Leaving the old conversation only failed to clear a flag there
        if let Err(e) = left {
            self.inner.notify(&e);
        }

        spawn_live_tail(Arc::downgrade(&self.inner), key.clone(), latest, cancel.clone());
        spawn_typing_watch(Arc::downgrade(&self.inner), key, peer.id, typing, cancel);

        if let Some(request) = request {
            self.inner.load_page(request).await?;
            self.inner.emit(PanelEvent::ScrollToBottom);
        }
        Ok(())
    }

    /// Fetch the page before the oldest loaded message, or the newest page if
    /// that one failed. Returns how many messages were added; 0 when
    /// exhausted or a fetch is already running.
    pub async fn load_older(&self) -> ClientResult<usize> {
        let request = {
            let mut state = self.inner.state();
            if state.window.key().is_none() {
                return Err(ClientError::NoActiveConversation);
            }
            state.window.begin_older()
        };

        match request {
            Some(request) => self.inner.load_page(request).await,
            None => Ok(0),
        }
    }

    /// Close the open conversation, if any.
    pub async fn close(&self) -> ClientResult<()> {
        {
            let mut state = self.inner.state();
            if let Some(cancel) = state.subscriptions.take() {
                cancel.cancel();
            }
            state.peer = None;
            state.remote_typing = false;
            state.window.reset(None);
        }
        self.inner.emit(PanelEvent::MessagesChanged);
        self.inner.typing.attach(None).await
    }

    // -- Composer --

    /// The input text changed.
    pub async fn on_input(&self, text: &str) -> ClientResult<()> {
        self.inner.composer().set_text(text);
        self.inner.typing.on_local_edit().await
    }

    pub fn set_caret(&self, caret: usize) {
        self.inner.composer().set_caret(caret);
    }

    pub async fn insert_emoji(&self, emoji: &str) -> ClientResult<()> {
        self.inner.composer().insert(emoji);
        self.inner.typing.on_local_edit().await
    }

    pub async fn on_blur(&self) -> ClientResult<()> {
        self.inner.typing.blur().await
    }

    /// Send the composer's trimmed text to the open conversation. Returns
    /// `None` without sending when the text is blank. The message shows up
    /// through the live tail.
    pub async fn send_message(&self) -> ClientResult<Option<MessageId>> {
        let me = self.inner.session.current_id().ok_or(ClientError::NotSignedIn)?;
        let (key, peer) = {
            let state = self.inner.state();
            match (state.window.key(), state.peer.as_ref()) {
                (Some(key), Some(peer)) => (key.clone(), peer.id.clone()),
                _ => return Err(ClientError::NoActiveConversation),
            }
        };
        let Some(text) = self.inner.composer().body() else {
            return Ok(None);
        };

        let message = NewMessage {
            sender_id: me,
            receiver_id: peer,
            text,
            time_label: Local::now().format("%H:%M").to_string(),
        };
        let id = self.inner.store.append_message(&key, message).await?;
        debug!("Sent {} to {}", id, key);

        self.inner.composer().clear();
        if let Err(e) = self.inner.typing.blur().await {
            self.inner.notify(&e);
        }
        Ok(Some(id))
    }
}

impl Drop for ChatPanel {
    fn drop(&mut self) {
        if let Some(cancel) = self.inner.state().subscriptions.take() {
            cancel.cancel();
        }
    }
}

impl PanelInner {
    fn state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn composer(&self) -> MutexGuard<'_, Composer> {
        self.composer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: PanelEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn notify(&self, err: &ClientError) {
        self.emit(PanelEvent::Notice(err.notice()));
    }

    async fn load_page(&self, request: PageRequest) -> ClientResult<usize> {
        let page = match self.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                error!("Loading messages for {} failed: {}", request.key, e);
                self.state().window.fail(&request);
                return Err(e);
            }
        };

        let added = self.state().window.complete(&request, page);
        match added {
            Some(added) => {
                debug!("Loaded {} messages for {}", added, request.key);
                if added > 0 {
                    self.emit(PanelEvent::MessagesChanged);
                }
                Ok(added)
            }
            None => {
                warn!("Discarding page for {}, conversation changed", request.key);
                Ok(0)
            }
        }
    }

    async fn fetch_page(&self, request: &PageRequest) -> ClientResult<Vec<Message>> {
        let docs = self
            .store
            .query_messages(&request.key, request.limit, request.before.as_ref())
            .await?;
        let page = docs
            .iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(page)
    }

    fn apply_live(&self, key: &ConversationKey, doc: &Document) {
        let message = match Message::try_from(doc) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring unreadable message: {}", e);
                return;
            }
        };

        let merged = self.state().window.merge_live(key, message);
        if merged {
            self.emit(PanelEvent::MessagesChanged);
            self.emit(PanelEvent::ScrollToBottom);
        }
    }

    fn apply_typing(&self, key: &ConversationKey, peer: &UserId, doc: &Document) {
        let typing = match TypingState::try_from(doc) {
            Ok(state) => state.is_typing(peer),
            Err(e) => {
                warn!("Ignoring unreadable typing document: {}", e);
                return;
            }
        };

        let changed = {
            let mut state = self.state();
            if state.window.key() != Some(key) {
                debug!("Dropping typing update for {}", key);
                return;
            }
            std::mem::replace(&mut state.remote_typing, typing) != typing
        };
        if changed {
            self.emit(PanelEvent::RemoteTyping(typing));
        }
    }
}

fn spawn_live_tail(
    panel: Weak<PanelInner>,
    key: ConversationKey,
    mut latest: BoxStream<'static, ChangeEvent>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = latest.next() => {
                    let Some(ChangeEvent::Added(doc)) = event else { break };
                    let Some(panel) = panel.upgrade() else { break };
                    panel.apply_live(&key, &doc);
                }
            }
        }
        debug!("Live tail for {} stopped", key);
    });
}

fn spawn_typing_watch(
    panel: Weak<PanelInner>,
    key: ConversationKey,
    peer: UserId,
    mut snapshots: BoxStream<'static, Document>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                doc = snapshots.next() => {
                    let Some(doc) = doc else { break };
                    let Some(panel) = panel.upgrade() else { break };
                    panel.apply_typing(&key, &peer, &doc);
                }
            }
        }
        debug!("Typing watch for {} stopped", key);
    });
}
