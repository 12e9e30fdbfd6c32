/// Shared vocabulary of the messenger client: typed records, the untyped
/// document shape the store speaks, change events, and the service contracts
/// the client consumes.

pub mod api;
pub mod document;
pub mod error;
pub mod events;
pub mod models;
pub mod store;

pub use document::{Document, Fields};
pub use error::{AuthError, DocumentError, StoreError, StoreResult};
pub use models::{ConversationKey, Message, MessageCursor, MessageId, TypingState, UserId, UserProfile};
