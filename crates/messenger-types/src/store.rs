//! Contracts of the managed service the client is built against.
//!
//! Subscriptions are streams; dropping a stream cancels the subscription.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::api::{AuthIdentity, NewMessage, ProviderAssertion};
use crate::document::{Document, Fields};
use crate::error::{AuthError, StoreResult};
use crate::events::ChangeEvent;
use crate::models::{ConversationKey, MessageCursor, MessageId, UserId};

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create an email/password account. Fails with `AlreadyRegistered`.
    async fn register(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    /// Fails with `UnknownUser` or `InvalidCredentials`.
    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError>;

    /// Sign in with an identity vouched for by a provider; the account is
    /// created on first use.
    async fn authenticate_with_provider(
        &self,
        assertion: ProviderAssertion,
    ) -> Result<AuthIdentity, AuthError>;

    /// Resume a session from a token issued by an earlier sign-in.
    async fn resume(&self, token: &str) -> Result<AuthIdentity, AuthError>;

    async fn sign_out(&self, id: &UserId) -> Result<(), AuthError>;
}

/// External sign-in flow (the "popup"). Fails with `ProviderCancelled` when
/// the user backs out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn sign_in(&self) -> Result<ProviderAssertion, AuthError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    // -- Profiles --

    async fn get_profile(&self, id: &UserId) -> StoreResult<Option<Document>>;

    /// Create or replace the profile document.
    async fn put_profile(&self, id: &UserId, fields: Fields) -> StoreResult<()>;

    /// Merge `fields` into an existing profile document.
    async fn update_profile(&self, id: &UserId, fields: Fields) -> StoreResult<()>;

    async fn list_profiles(&self) -> StoreResult<Vec<Document>>;

    /// Profiles whose `field` equals `value`.
    async fn find_profiles(&self, field: &str, value: &Value) -> StoreResult<Vec<Document>>;

    /// Every profile document written from now on.
    async fn subscribe_profiles(&self) -> StoreResult<BoxStream<'static, Document>>;

    // -- Messages --

    async fn append_message(
        &self,
        key: &ConversationKey,
        message: NewMessage,
    ) -> StoreResult<MessageId>;

    /// Up to `limit` messages strictly older than `before`, newest first.
    async fn query_messages(
        &self,
        key: &ConversationKey,
        limit: usize,
        before: Option<&MessageCursor>,
    ) -> StoreResult<Vec<Document>>;

    /// Newest-first live query with limit 1: yields the current latest message
    /// (if any), then every message appended afterwards.
    async fn subscribe_latest(
        &self,
        key: &ConversationKey,
    ) -> StoreResult<BoxStream<'static, ChangeEvent>>;

    // -- Typing --

    /// Merged write of one participant's flag.
    async fn set_typing_flag(
        &self,
        key: &ConversationKey,
        user: &UserId,
        typing: bool,
    ) -> StoreResult<()>;

    /// Snapshots of the conversation's typing document, starting with the
    /// current one.
    async fn subscribe_typing(
        &self,
        key: &ConversationKey,
    ) -> StoreResult<BoxStream<'static, Document>>;
}
