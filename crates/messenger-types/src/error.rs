use thiserror::Error;

/// Failures reported by the authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("no account exists for {0}")]
    UnknownUser(String),

    #[error("{0} is already registered")]
    AlreadyRegistered(String),

    #[error("sign-in was cancelled")]
    ProviderCancelled,

    #[error("session token is invalid or expired")]
    InvalidToken,

    #[error("authentication service unavailable: {0}")]
    Unavailable(String),
}

/// A document read from the store did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("{collection}/{id}: missing field `{field}`")]
    MissingField {
        collection: String,
        id: String,
        field: &'static str,
    },

    #[error("{collection}/{id}: field `{field}` {reason}")]
    InvalidField {
        collection: String,
        id: String,
        field: &'static str,
        reason: String,
    },
}

/// Failures reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("no such document: {0}")]
    NotFound(String),

    #[error(transparent)]
    Malformed(#[from] DocumentError),
}

pub type StoreResult<T> = Result<T, StoreError>;
