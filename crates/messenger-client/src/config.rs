use std::time::Duration;

/// Messages fetched per page, both on open and on "load older".
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Inactivity after which the local typing flag is cleared.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(1500);

/// Generated avatar for password accounts; the username is appended.
pub const DEFAULT_AVATAR_BASE: &str = "https://ui-avatars.com/api/?background=random&color=fff&name=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub page_size: usize,
    pub typing_timeout: Duration,
    pub avatar_base: String,
}

impl ClientConfig {
    pub fn default_avatar(&self, username: &str) -> String {
        format!("{}{}", self.avatar_base, username)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            typing_timeout: DEFAULT_TYPING_TIMEOUT,
            avatar_base: DEFAULT_AVATAR_BASE.to_string(),
        }
    }
}
