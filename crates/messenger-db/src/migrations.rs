use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS credentials (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT,
            provider    TEXT NOT NULL DEFAULT 'password',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Profile documents, stored as JSON objects
        CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY,
            data        TEXT NOT NULL,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- created_at is milliseconds since the epoch, strictly increasing per conversation
        CREATE TABLE IF NOT EXISTS messages (
            id                  TEXT PRIMARY KEY,
            conversation_key    TEXT NOT NULL,
            created_at          INTEGER NOT NULL,
            data                TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_key, created_at, id);

        CREATE TABLE IF NOT EXISTS typing (
            conversation_key    TEXT NOT NULL,
            user_id             TEXT NOT NULL,
            is_typing           INTEGER NOT NULL,
            updated_at          TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (conversation_key, user_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
