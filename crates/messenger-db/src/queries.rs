use crate::Database;
use crate::models::{CredentialRow, MessageRow, ProfileRow, TypingRow};
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

impl Database {
    // -- Credentials --

    pub fn create_credential(
        &self,
        id: &str,
        email: &str,
        password_hash: Option<&str>,
        provider: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO credentials (id, email, password, provider) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, email, password_hash, provider],
            )?;
            Ok(())
        })
    }

    pub fn get_credential_by_email(&self, email: &str) -> Result<Option<CredentialRow>> {
        self.with_conn(|conn| query_credential(conn, "email", email))
    }

    pub fn get_credential_by_id(&self, id: &str) -> Result<Option<CredentialRow>> {
        self.with_conn(|conn| query_credential(conn, "id", id))
    }

    // -- Profiles --

    pub fn put_profile(&self, id: &str, data: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_string(data)?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, data) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = datetime('now')",
                (id, &json),
            )?;
            Ok(())
        })
    }

    /// Merge `fields` into an existing profile. Returns the merged document,
    /// or `None` if there is no profile with that id.
    pub fn merge_profile(
        &self,
        id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Option<Map<String, Value>>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row("SELECT data FROM profiles WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            let Some(existing) = existing else {
                return Ok(None);
            };

            let mut data = parse_object(&existing)?;
            for (field, value) in fields {
                data.insert(field.clone(), value.clone());
            }

            tx.execute(
                "UPDATE profiles SET data = ?2, updated_at = datetime('now') WHERE id = ?1",
                (id, serde_json::to_string(&data)?),
            )?;
            tx.commit()?;

            Ok(Some(data))
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT id, data FROM profiles WHERE id = ?1", [id], |row| {
                Ok(ProfileRow {
                    id: row.get(0)?,
                    data: row.get(1)?,
                })
            })
            .optional()
        })
    }

    pub fn list_profiles(&self) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, data FROM profiles ORDER BY rowid")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ProfileRow {
                        id: row.get(0)?,
                        data: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Profiles whose top-level JSON `field` equals `value`.
    pub fn find_profiles(&self, field: &str, value: &Value) -> Result<Vec<ProfileRow>> {
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(anyhow!("Invalid profile field name: {:?}", field));
        }
        let path = format!("$.{}", field);
        let value = sql_value(value);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, data FROM profiles WHERE json_extract(data, ?1) = ?2 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![path, value], |row| {
                    Ok(ProfileRow {
                        id: row.get(0)?,
                        data: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Insert a message and assign its server timestamp. Timestamps are
    /// strictly increasing within a conversation even when the clock is not.
    pub fn insert_message(
        &self,
        id: &str,
        conversation_key: &str,
        data: &Map<String, Value>,
        now_millis: i64,
    ) -> Result<i64> {
        let json = serde_json::to_string(data)?;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let last: i64 = tx.query_row(
                "SELECT COALESCE(MAX(created_at), 0) FROM messages WHERE conversation_key = ?1",
                [conversation_key],
                |row| row.get(0),
            )?;
            let created_at = now_millis.max(last + 1);

            tx.execute(
                "INSERT INTO messages (id, conversation_key, created_at, data) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, conversation_key, created_at, json],
            )?;
            tx.commit()?;

            Ok(created_at)
        })
    }

    /// Newest-first page of a conversation. With `before`, only messages
    /// strictly older than that `(created_at, id)` position are returned.
    pub fn get_messages(
        &self,
        conversation_key: &str,
        limit: u32,
        before: Option<(i64, &str)>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, conversation_key, limit, before))
    }

    // -- Typing --

    pub fn set_typing(&self, conversation_key: &str, user_id: &str, is_typing: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO typing (conversation_key, user_id, is_typing) VALUES (?1, ?2, ?3)
                 ON CONFLICT(conversation_key, user_id)
                 DO UPDATE SET is_typing = excluded.is_typing, updated_at = datetime('now')",
                rusqlite::params![conversation_key, user_id, is_typing],
            )?;
            Ok(())
        })
    }

    pub fn get_typing(&self, conversation_key: &str) -> Result<Vec<TypingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, is_typing FROM typing WHERE conversation_key = ?1 ORDER BY user_id",
            )?;
            let rows = stmt
                .query_map([conversation_key], |row| {
                    Ok(TypingRow {
                        user_id: row.get(0)?,
                        is_typing: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

/// Parse a stored JSON document that must be an object.
pub fn parse_object(json: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(json)? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("Stored document is not an object: {}", other)),
    }
}

fn query_credential(conn: &Connection, column: &str, value: &str) -> Result<Option<CredentialRow>> {
    let sql = format!(
        "SELECT id, email, password, provider, created_at FROM credentials WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(CredentialRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                provider: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_messages(
    conn: &Connection,
    conversation_key: &str,
    limit: u32,
    before: Option<(i64, &str)>,
) -> Result<Vec<MessageRow>> {
    let rows = match before {
        Some((created_at, id)) => {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_key, created_at, data
                 FROM messages
                 WHERE conversation_key = ?1 AND (created_at, id) < (?2, ?3)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?4",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![conversation_key, created_at, id, limit],
                    message_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_key, created_at, data
                 FROM messages
                 WHERE conversation_key = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![conversation_key, limit], message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };

    Ok(rows)
}

fn message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_key: row.get(1)?,
        created_at: row.get(2)?,
        data: row.get(3)?,
    })
}

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
