use futures_util::stream::BoxStream;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use messenger_db::models::MessageRow;
use messenger_db::queries::parse_object;
use messenger_types::api::NewMessage;
use messenger_types::document::MESSAGES;
use messenger_types::events::{ChangeEvent, StoreEvent};
use messenger_types::{ConversationKey, Document, MessageCursor, MessageId, StoreError, StoreResult};

use crate::{LocalBackend, now_millis};

/// Upper bound on a single page request.
pub const MAX_PAGE_SIZE: usize = 200;

impl LocalBackend {
    pub async fn post_message(
        &self,
        key: &ConversationKey,
        message: NewMessage,
    ) -> StoreResult<MessageId> {
        let message_id = Uuid::new_v4().to_string();
        let mut fields = message.into_fields();

        let (mid, cid, stored) = (message_id.clone(), key.to_string(), fields.clone());
        let created_at = self
            .blocking(move |db| db.insert_message(&mid, &cid, &stored, now_millis()))
            .await?;
        fields.insert("createdAt".into(), json!(created_at));

        debug!("Message {} appended to {}", message_id, key);

        // Notify live queries
        self.dispatcher.broadcast(StoreEvent::MessageAdded {
            conversation: key.clone(),
            doc: Document::new(MESSAGES, message_id.clone(), fields),
        });

        Ok(MessageId(message_id))
    }

    /// Newest-first page strictly before `before`.
    pub async fn message_page(
        &self,
        key: &ConversationKey,
        limit: usize,
        before: Option<&MessageCursor>,
    ) -> StoreResult<Vec<Document>> {
        let cid = key.to_string();
        let limit = limit.min(MAX_PAGE_SIZE) as u32;
        let before = before.map(|c| (c.created_at.timestamp_millis(), c.id.0.clone()));

        let rows = self
            .blocking(move |db| {
                db.get_messages(&cid, limit, before.as_ref().map(|(ts, id)| (*ts, id.as_str())))
            })
            .await?;

        rows.into_iter().map(message_document).collect()
    }

    pub async fn latest_messages(
        &self,
        key: &ConversationKey,
    ) -> StoreResult<BoxStream<'static, ChangeEvent>> {
        // Subscribe first so an append racing the initial read is not lost;
        // it may then be reported twice, which consumers tolerate.
        let receiver = self.dispatcher.subscribe();
        let latest = self.message_page(key, 1, None).await?.into_iter().next();

        Ok(self.dispatcher.message_stream(receiver, key.clone(), latest))
    }
}

fn message_document(row: MessageRow) -> StoreResult<Document> {
    let mut data = parse_object(&row.data).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    data.insert("createdAt".into(), json!(row.created_at));
    Ok(Document::new(MESSAGES, row.id, data))
}
