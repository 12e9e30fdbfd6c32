//! Form payloads and the rules they are checked against before any service
//! call is made.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::ValidationErrors;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_BIO_LEN: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, &self.username);
        if self.username.chars().any(char::is_whitespace) {
            errors.add("username", "Username cannot contain spaces");
        }
        check_email(&mut errors, &self.email);

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", "Password must be at least 6 characters");
        }
        check_no_spaces(&mut errors, &self.password);

        if self.confirm_password.is_empty() {
            errors.add("confirm_password", "Confirm password is required");
        } else if self.confirm_password != self.password {
            errors.add("confirm_password", "Passwords do not match");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        check_no_spaces(&mut errors, &self.password);
        errors.into_result()
    }
}

/// Editable profile fields. Empty `bio` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub username: String,
    pub bio: String,
    pub photo_url: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, &self.username);
        if self.bio.chars().count() > MAX_BIO_LEN {
            errors.add("bio", "Bio must be under 200 characters");
        }
        if !is_valid_url(&self.photo_url) {
            errors.add("photo_url", "Enter a valid image URL");
        }
        errors.into_result()
    }
}

pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email.trim()))
}

/// Absolute URL with a host, e.g. `https://example.com/me.png`.
pub fn is_valid_url(raw: &str) -> bool {
    Url::parse(raw.trim()).is_ok_and(|url| url.has_host())
}

fn check_username(errors: &mut ValidationErrors, username: &str) {
    if username.trim().chars().count() < MIN_USERNAME_LEN {
        errors.add("username", "Username must be at least 3 characters");
    }
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    if !is_valid_email(email) {
        errors.add("email", "Must be a valid email");
    }
}

fn check_no_spaces(errors: &mut ValidationErrors, password: &str) {
    if password.chars().any(char::is_whitespace) {
        errors.add("password", "Password cannot contain spaces");
    }
}
