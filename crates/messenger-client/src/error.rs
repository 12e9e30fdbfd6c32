use std::fmt;

use messenger_types::{AuthError, DocumentError, StoreError};

/// Generic text shown for failures the user cannot act on.
pub const GENERIC_NOTICE: &str = "Something went wrong. Please try again.";

/// A rejected form field and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Per-field validation messages. At most one message is kept per field, the
/// first one reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.errors.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// `Ok` when nothing was reported.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("not signed in")]
    NotSignedIn,

    #[error("no conversation is open")]
    NoActiveConversation,
}

impl From<DocumentError> for ClientError {
    fn from(err: DocumentError) -> Self {
        Self::Store(StoreError::Malformed(err))
    }
}

impl ClientError {
    /// Short text for a non-blocking notice. Validation failures keep their
    /// field messages; everything else collapses to a generic line.
    pub fn notice(&self) -> String {
        match self {
            Self::Validation(errors) => errors.to_string(),
            Self::Auth(AuthError::InvalidCredentials | AuthError::UnknownUser(_)) => {
                "Invalid email or password".into()
            }
            Self::Auth(AuthError::ProviderCancelled) => "Sign-in was cancelled".into(),
            Self::Auth(AuthError::InvalidToken) => "Your session has expired. Please sign in again.".into(),
            Self::NotSignedIn => "Please sign in first".into(),
            Self::NoActiveConversation => "Select a user to start chat".into(),
            Self::Auth(_) | Self::Store(_) => GENERIC_NOTICE.into(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_per_field_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Must be a valid email");
        errors.add("email", "Email already registered");
        errors.add("password", "Password must be at least 6 characters");

        assert_eq!(errors.get("email"), Some("Must be a valid email"));
        assert_eq!(errors.iter().count(), 2);
        assert_eq!(
            errors.to_string(),
            "email: Must be a valid email; password: Password must be at least 6 characters"
        );
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn notices_hide_internal_detail() {
        let err = ClientError::from(StoreError::Unavailable("disk I/O error".into()));
        assert_eq!(err.notice(), GENERIC_NOTICE);

        let err = ClientError::from(AuthError::UnknownUser("a@b.co".into()));
        assert_eq!(err.notice(), "Invalid email or password");

        let err = ClientError::from(ValidationErrors::single("username", "Username already in use"));
        assert_eq!(err.notice(), "username: Username already in use");
    }
}
