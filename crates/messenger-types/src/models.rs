use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{Document, MESSAGES, TYPING, USERS};
use crate::error::DocumentError;

/// Separator between the two participant ids of a conversation key.
pub const KEY_SEPARATOR: char = '_';

// -- Identifiers --

/// Stable user identifier issued by the authentication service.
///
/// Never empty and never contains the key separator, `/` or whitespace, so
/// that two ids joined by [`KEY_SEPARATOR`] split back unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && !id
                .chars()
                .any(|c| c == KEY_SEPARATOR || c == '/' || c.is_whitespace());
        valid.then_some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.clone()).ok_or_else(|| format!("invalid user id {value:?}"))
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical key of a two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey(String);

impl ConversationKey {
    /// Order-independent: `derive(a, b) == derive(b, a)`.
    pub fn derive(a: &UserId, b: &UserId) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{lo}{KEY_SEPARATOR}{hi}"))
    }

    /// Key for the current user and the selected contact, if both are known.
    pub fn between(me: Option<&UserId>, peer: Option<&UserId>) -> Option<Self> {
        Some(Self::derive(me?, peer?))
    }

    /// Rebuild a key read back from storage.
    pub fn parse(raw: &str) -> Option<Self> {
        let (a, b) = raw.split_once(KEY_SEPARATOR)?;
        let (a, b) = (UserId::new(a)?, UserId::new(b)?);
        (a <= b).then(|| Self(raw.to_string()))
    }

    pub fn participants(&self) -> (UserId, UserId) {
        let (a, b) = self
            .0
            .split_once(KEY_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""));
        (UserId(a.to_string()), UserId(b.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the conversation key for two raw identifiers. `None` when either is
/// absent or not a valid [`UserId`].
pub fn derive_key(a: &str, b: &str) -> Option<ConversationKey> {
    Some(ConversationKey::derive(&UserId::new(a)?, &UserId::new(b)?))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// -- Users --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub provider: Option<String>,
    pub online: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Username, falling back to email.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.email)
    }
}

impl TryFrom<&Document> for UserProfile {
    type Error = DocumentError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        expect_collection(doc, USERS)?;

        let id = UserId::new(doc.id.as_str())
            .ok_or_else(|| doc.invalid("uid", format!("{:?} is not a valid user id", doc.id)))?;
        if let Some(uid) = doc.opt_str_field("uid")? {
            if uid != doc.id {
                return Err(doc.invalid("uid", format!("{uid:?} does not match the document id")));
            }
        }

        let created_at = match doc.data.get("createdAt") {
            None | Some(serde_json::Value::Null) => None,
            Some(_) => Some(doc.timestamp_field("createdAt")?),
        };

        Ok(Self {
            id,
            email: doc.str_field("email")?.to_string(),
            username: doc.opt_str_field("username")?.map(str::to_string),
            photo_url: doc.opt_str_field("photoURL")?.map(str::to_string),
            bio: doc.opt_str_field("bio")?.map(str::to_string),
            provider: doc.opt_str_field("provider")?.map(str::to_string),
            online: doc.bool_field_or("isOnline", false)?,
            created_at,
        })
    }
}

// -- Messages --

/// Messages are immutable once the store has assigned `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Send time as formatted by the sending client.
    pub time_label: String,
}

impl Message {
    /// Sort key inside a conversation: server time, ties broken by id.
    pub fn order_key(&self) -> (DateTime<Utc>, &MessageId) {
        (self.created_at, &self.id)
    }

    pub fn cursor(&self) -> MessageCursor {
        MessageCursor {
            created_at: self.created_at,
            id: self.id.clone(),
        }
    }
}

impl TryFrom<&Document> for Message {
    type Error = DocumentError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        expect_collection(doc, MESSAGES)?;

        let user = |field: &'static str| -> Result<UserId, DocumentError> {
            let raw = doc.str_field(field)?;
            UserId::new(raw).ok_or_else(|| doc.invalid(field, format!("{raw:?} is not a valid user id")))
        };

        Ok(Self {
            id: MessageId(doc.id.clone()),
            sender_id: user("senderId")?,
            receiver_id: user("receiverId")?,
            text: doc.str_field("text")?.to_string(),
            created_at: doc.timestamp_field("createdAt")?,
            time_label: doc.opt_str_field("time")?.unwrap_or_default().to_string(),
        })
    }
}

/// Position of the oldest loaded message; pages are requested strictly before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCursor {
    pub created_at: DateTime<Utc>,
    pub id: MessageId,
}

// -- Typing --

/// Snapshot of a conversation's typing document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypingState {
    pub flags: HashMap<UserId, bool>,
}

impl TypingState {
    pub fn is_typing(&self, user: &UserId) -> bool {
        self.flags.get(user).copied().unwrap_or(false)
    }
}

impl TryFrom<&Document> for TypingState {
    type Error = DocumentError;

    fn try_from(doc: &Document) -> Result<Self, Self::Error> {
        expect_collection(doc, TYPING)?;

        let mut flags = HashMap::with_capacity(doc.data.len());
        for (field, value) in &doc.data {
            let Some(user) = UserId::new(field.as_str()) else {
                return Err(doc.invalid("typing", format!("{field:?} is not a valid user id")));
            };
            let typing = value
                .as_bool()
                .ok_or_else(|| doc.invalid("typing", format!("flag for {field} is not a bool")))?;
            flags.insert(user, typing);
        }

        Ok(Self { flags })
    }
}

fn expect_collection(doc: &Document, collection: &str) -> Result<(), DocumentError> {
    if doc.collection == collection {
        Ok(())
    } else {
        Err(doc.invalid("collection", format!("expected {collection}, got {}", doc.collection)))
    }
}
