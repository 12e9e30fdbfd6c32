//! Loaded slice of one conversation: pages fetched backwards from the newest
//! message, merged with live appends.

use std::collections::HashSet;

use messenger_types::{ConversationKey, Message, MessageCursor, MessageId};

/// A page fetch handed out by the window. Completing it against a window that
/// has since switched conversation is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub key: ConversationKey,
    pub before: Option<MessageCursor>,
    pub limit: usize,
    generation: u64,
}

impl PageRequest {
    pub fn is_initial(&self) -> bool {
        self.before.is_none()
    }
}

#[derive(Debug)]
pub struct MessageWindow {
    page_size: usize,
    key: Option<ConversationKey>,
    generation: u64,
    /// Oldest first, ordered by `(created_at, id)`.
    messages: Vec<Message>,
    ids: HashSet<MessageId>,
    cursor: Option<MessageCursor>,
    exhausted: bool,
    in_flight: bool,
}

impl MessageWindow {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            key: None,
            generation: 0,
            messages: Vec::new(),
            ids: HashSet::new(),
            cursor: None,
            exhausted: false,
            in_flight: false,
        }
    }

    pub fn key(&self) -> Option<&ConversationKey> {
        self.key.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn cursor(&self) -> Option<&MessageCursor> {
        self.cursor.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Whether the newest page has been folded in.
    pub fn has_first_page(&self) -> bool {
        self.cursor.is_some() || self.exhausted
    }

    /// Drop everything loaded and point the window at `key`. Returns the
    /// request for the newest page when there is a conversation to load.
    pub fn reset(&mut self, key: Option<ConversationKey>) -> Option<PageRequest> {
        self.generation += 1;
        self.messages.clear();
        self.ids.clear();
        self.cursor = None;
        self.exhausted = false;
        self.in_flight = false;
        self.key = key;

        let key = self.key.clone()?;
        self.in_flight = true;
        Some(PageRequest {
            key,
            before: None,
            limit: self.page_size,
            generation: self.generation,
        })
    }

    /// Request for the page before the oldest loaded message, unless one is
    /// already outstanding or there is nothing older. If the newest page never
    /// arrived, it is requested again instead.
    pub fn begin_older(&mut self) -> Option<PageRequest> {
        if self.exhausted || self.in_flight {
            return None;
        }
        let key = self.key.clone()?;
        let before = self.cursor.clone();

        self.in_flight = true;
        Some(PageRequest {
            key,
            before,
            limit: self.page_size,
            generation: self.generation,
        })
    }

    /// Fold in a fetched page (newest first, as the store returns it).
    /// Returns how many messages were new, or `None` if the request is stale.
    pub fn complete(&mut self, request: &PageRequest, page: Vec<Message>) -> Option<usize> {
        if !self.is_current(request) {
            return None;
        }
        self.in_flight = false;

        // A short first page means the conversation is fully loaded; later
        // pages only stop the window once one comes back empty.
        self.exhausted = if request.is_initial() {
            page.len() < request.limit
        } else {
            page.is_empty()
        };

        let mut added = 0;
        for message in page.into_iter().rev() {
            if self.insert(message) {
                added += 1;
            }
        }
        self.cursor = self.messages.first().map(Message::cursor);
        Some(added)
    }

    /// Release a failed request. Loaded messages, cursor and exhaustion are
    /// left as they were.
    pub fn fail(&mut self, request: &PageRequest) {
        if self.is_current(request) {
            self.in_flight = false;
        }
    }

    /// Merge a live append. Returns `false` for other conversations and for
    /// messages already loaded.
    pub fn merge_live(&mut self, key: &ConversationKey, message: Message) -> bool {
        if self.key.as_ref() != Some(key) {
            return false;
        }
        self.insert(message)
    }

    fn is_current(&self, request: &PageRequest) -> bool {
        request.generation == self.generation && self.key.as_ref() == Some(&request.key)
    }

    fn insert(&mut self, message: Message) -> bool {
        if self.ids.contains(&message.id) {
            return false;
        }
        let at = self
            .messages
            .partition_point(|m| m.order_key() < message.order_key());
        self.ids.insert(message.id.clone());
        self.messages.insert(at, message);
        true
    }
}
