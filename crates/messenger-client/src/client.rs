use std::sync::Arc;

use tokio::sync::mpsc;

use messenger_types::store::{AuthService, DocumentStore};

use crate::chat::{ChatPanel, PanelEvent};
use crate::config::ClientConfig;
use crate::contacts::ContactList;
use crate::identity::IdentityResolver;
use crate::session::Session;

/// Everything one signed-in window needs, sharing a single [`Session`].
pub struct MessengerClient {
    pub session: Arc<Session>,
    pub identity: IdentityResolver,
    pub contacts: ContactList,
    pub chat: ChatPanel,
}

impl MessengerClient {
    pub fn new(
        auth: Arc<dyn AuthService>,
        store: Arc<dyn DocumentStore>,
        config: ClientConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PanelEvent>) {
        let session = Arc::new(Session::new());
        let (chat, events) = ChatPanel::new(store.clone(), session.clone(), &config);
        let client = Self {
            identity: IdentityResolver::new(auth, store.clone(), session.clone(), config),
            contacts: ContactList::new(store, session.clone()),
            chat,
            session,
        };
        (client, events)
    }
}
