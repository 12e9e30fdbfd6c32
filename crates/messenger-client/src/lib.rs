/// Client core of the messenger: session context, identity flows, the contact
/// roster and the chat panel, written against the service contracts in
/// `messenger_types::store`.

pub mod chat;
pub mod client;
pub mod composer;
pub mod config;
pub mod contacts;
pub mod error;
pub mod identity;
pub mod session;
pub mod typing;
pub mod validation;
pub mod window;

pub use chat::{ChatPanel, PanelEvent};
pub use client::MessengerClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, ValidationErrors};
pub use session::Session;
