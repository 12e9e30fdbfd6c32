use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use messenger_client::ClientConfig;

/// Placeholder JWT secrets that MUST NOT be used.
pub const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub client: ClientConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let db_path = var("MESSENGER_DB_PATH").unwrap_or_else(|| "messenger.db".into());
        let jwt_secret = var("MESSENGER_JWT_SECRET").unwrap_or_default();

        let mut client = ClientConfig::default();
        if let Some(raw) = var("MESSENGER_PAGE_SIZE") {
            client.page_size = raw
                .parse()
                .with_context(|| format!("MESSENGER_PAGE_SIZE must be a number, got {:?}", raw))?;
            anyhow::ensure!(client.page_size > 0, "MESSENGER_PAGE_SIZE must be at least 1");
        }
        if let Some(raw) = var("MESSENGER_TYPING_TIMEOUT_MS") {
            let millis: u64 = raw.parse().with_context(|| {
                format!("MESSENGER_TYPING_TIMEOUT_MS must be a number, got {:?}", raw)
            })?;
            client.typing_timeout = Duration::from_millis(millis);
        }

        Ok(Self {
            db_path: db_path.into(),
            jwt_secret,
            client,
        })
    }

    pub fn has_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("messenger.db"));
        assert_eq!(config.client, ClientConfig::default());
        assert!(config.has_placeholder_secret());
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("MESSENGER_DB_PATH", "/tmp/chat.db"),
            ("MESSENGER_JWT_SECRET", "a-real-secret"),
            ("MESSENGER_PAGE_SIZE", "25"),
            ("MESSENGER_TYPING_TIMEOUT_MS", "800"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/chat.db"));
        assert_eq!(config.client.page_size, 25);
        assert_eq!(config.client.typing_timeout, Duration::from_millis(800));
        assert!(!config.has_placeholder_secret());
    }

    #[test]
    fn rejects_bad_numbers_and_placeholders() {
        assert!(Config::from_lookup(lookup(&[("MESSENGER_PAGE_SIZE", "ten")])).is_err());
        assert!(Config::from_lookup(lookup(&[("MESSENGER_PAGE_SIZE", "0")])).is_err());

        let config = Config::from_lookup(lookup(&[("MESSENGER_JWT_SECRET", "dev-secret-change-me")])).unwrap();
        assert!(config.has_placeholder_secret());
    }
}
