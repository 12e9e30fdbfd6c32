use futures_util::stream::BoxStream;
use serde_json::Value;

use messenger_types::document::TYPING;
use messenger_types::events::StoreEvent;
use messenger_types::{ConversationKey, Document, Fields, StoreResult, UserId};

use crate::LocalBackend;

impl LocalBackend {
    pub async fn write_typing_flag(
        &self,
        key: &ConversationKey,
        user: &UserId,
        typing: bool,
    ) -> StoreResult<()> {
        let (cid, uid) = (key.to_string(), user.to_string());
        self.blocking(move |db| db.set_typing(&cid, &uid, typing)).await?;

        let doc = self.typing_document(key).await?;
        self.dispatcher.broadcast(StoreEvent::TypingChanged {
            conversation: key.clone(),
            doc,
        });
        Ok(())
    }

    /// Current typing document of a conversation; empty until someone types.
    pub async fn typing_document(&self, key: &ConversationKey) -> StoreResult<Document> {
        let cid = key.to_string();
        let rows = self.blocking(move |db| db.get_typing(&cid)).await?;

        let fields: Fields = rows
            .into_iter()
            .map(|row| (row.user_id, Value::Bool(row.is_typing)))
            .collect();
        Ok(Document::new(TYPING, key.as_str(), fields))
    }

    pub async fn typing_snapshots(
        &self,
        key: &ConversationKey,
    ) -> StoreResult<BoxStream<'static, Document>> {
        let receiver = self.dispatcher.subscribe();
        let current = self.typing_document(key).await?;
        Ok(self.dispatcher.typing_stream(receiver, key.clone(), current))
    }
}
