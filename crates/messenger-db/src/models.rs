/// Database row types. These map directly to SQLite rows.
/// Distinct from messenger-types records to keep the DB layer independent.

pub struct CredentialRow {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string; `None` for provider-only accounts.
    pub password: Option<String>,
    pub provider: String,
    pub created_at: String,
}

pub struct ProfileRow {
    pub id: String,
    pub data: String,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_key: String,
    pub created_at: i64,
    pub data: String,
}

pub struct TypingRow {
    pub user_id: String,
    pub is_typing: bool,
}
