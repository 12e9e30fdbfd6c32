use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;

use messenger_types::api::NewMessage;
use messenger_types::events::ChangeEvent;
use messenger_types::store::DocumentStore;
use messenger_types::{
    ConversationKey, Document, Fields, MessageCursor, MessageId, StoreResult, UserId,
};

use crate::LocalBackend;

#[async_trait]
impl DocumentStore for LocalBackend {
    async fn get_profile(&self, id: &UserId) -> StoreResult<Option<Document>> {
        self.profile(id).await
    }

    async fn put_profile(&self, id: &UserId, fields: Fields) -> StoreResult<()> {
        self.write_profile(id, fields).await
    }

    async fn update_profile(&self, id: &UserId, fields: Fields) -> StoreResult<()> {
        self.merge_profile(id, fields).await
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Document>> {
        self.profiles().await
    }

    async fn find_profiles(&self, field: &str, value: &Value) -> StoreResult<Vec<Document>> {
        self.profiles_where(field, value).await
    }

    async fn subscribe_profiles(&self) -> StoreResult<BoxStream<'static, Document>> {
        Ok(self.dispatcher.profile_stream())
    }

    async fn append_message(
        &self,
        key: &ConversationKey,
        message: NewMessage,
    ) -> StoreResult<MessageId> {
        self.post_message(key, message).await
    }

    async fn query_messages(
        &self,
        key: &ConversationKey,
        limit: usize,
        before: Option<&MessageCursor>,
    ) -> StoreResult<Vec<Document>> {
        self.message_page(key, limit, before).await
    }

    async fn subscribe_latest(
        &self,
        key: &ConversationKey,
    ) -> StoreResult<BoxStream<'static, ChangeEvent>> {
        self.latest_messages(key).await
    }

    async fn set_typing_flag(
        &self,
        key: &ConversationKey,
        user: &UserId,
        typing: bool,
    ) -> StoreResult<()> {
        self.write_typing_flag(key, user, typing).await
    }

    async fn subscribe_typing(
        &self,
        key: &ConversationKey,
    ) -> StoreResult<BoxStream<'static, Document>> {
        self.typing_snapshots(key).await
    }
}
