/// Reference implementation of the managed messaging service: accounts,
/// profile documents, conversations and typing documents on SQLite, with live
/// queries served by the in-process dispatcher.

pub mod auth;
pub mod messages;
pub mod profiles;
pub mod provider;
pub mod store;
pub mod token;
pub mod typing;

use std::sync::Arc;

use tracing::error;

use messenger_db::Database;
use messenger_gateway::Dispatcher;
use messenger_types::{StoreError, StoreResult};

pub use provider::StaticProvider;

pub struct LocalBackend {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    jwt_secret: String,
}

impl LocalBackend {
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> Self {
        Self {
            db: Arc::new(db),
            dispatcher: Dispatcher::new(),
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Backend over a private in-memory database.
    pub fn in_memory(jwt_secret: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self::new(Database::open_in_memory()?, jwt_secret))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run a blocking DB call off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                StoreError::Unavailable(e.to_string())
            })?
            .map_err(|e| {
                error!("store operation failed: {:#}", e);
                StoreError::Unavailable(e.to_string())
            })
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
