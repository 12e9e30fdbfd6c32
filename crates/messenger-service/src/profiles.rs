use serde_json::{Value, json};
use tracing::debug;

use messenger_db::models::ProfileRow;
use messenger_db::queries::parse_object;
use messenger_types::document::USERS;
use messenger_types::events::StoreEvent;
use messenger_types::{Document, Fields, StoreError, StoreResult, UserId};

use crate::{LocalBackend, now_millis};

impl LocalBackend {
    pub async fn profile(&self, id: &UserId) -> StoreResult<Option<Document>> {
        let id = id.to_string();
        let row = self.blocking(move |db| db.get_profile(&id)).await?;
        row.map(profile_document).transpose()
    }

    /// Create or replace a profile. `uid` and `createdAt` are filled in when
    /// the caller leaves them out.
    pub async fn write_profile(&self, id: &UserId, mut fields: Fields) -> StoreResult<()> {
        fields
            .entry("uid")
            .or_insert_with(|| json!(id.as_str()));
        fields
            .entry("createdAt")
            .or_insert_with(|| json!(now_millis()));

        let doc = Document::new(USERS, id.as_str(), fields.clone());
        let key = id.to_string();
        self.blocking(move |db| db.put_profile(&key, &fields)).await?;

        debug!("Profile {} written", id);
        self.dispatcher.broadcast(StoreEvent::ProfileChanged { doc });
        Ok(())
    }

    pub async fn merge_profile(&self, id: &UserId, fields: Fields) -> StoreResult<()> {
        let key = id.to_string();
        let merged = self
            .blocking(move |db| db.merge_profile(&key, &fields))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", USERS, id)))?;

        debug!("Profile {} updated", id);
        self.dispatcher.broadcast(StoreEvent::ProfileChanged {
            doc: Document::new(USERS, id.as_str(), merged),
        });
        Ok(())
    }

    pub async fn profiles(&self) -> StoreResult<Vec<Document>> {
        let rows = self.blocking(|db| db.list_profiles()).await?;
        rows.into_iter().map(profile_document).collect()
    }

    pub async fn profiles_where(&self, field: &str, value: &Value) -> StoreResult<Vec<Document>> {
        let (field, value) = (field.to_string(), value.clone());
        let rows = self
            .blocking(move |db| db.find_profiles(&field, &value))
            .await?;
        rows.into_iter().map(profile_document).collect()
    }
}

fn profile_document(row: ProfileRow) -> StoreResult<Document> {
    let data = parse_object(&row.data).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(Document::new(USERS, row.id, data))
}
