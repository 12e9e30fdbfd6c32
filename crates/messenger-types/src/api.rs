use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::document::Fields;
use crate::models::UserId;

// -- Auth --

/// Provider name recorded for email/password accounts.
pub const PASSWORD_PROVIDER: &str = "password";

/// Result of a successful sign-in or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Bearer token accepted by `AuthService::resume`.
    pub token: String,
}

/// What an external identity provider vouches for after its sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAssertion {
    pub provider: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

// -- Profiles --

/// Full profile written once at account creation. The store stamps `createdAt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: UserId,
    pub email: String,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub provider: String,
}

impl NewProfile {
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("uid".into(), json!(self.id.as_str()));
        fields.insert("email".into(), json!(self.email));
        if let Some(username) = self.username {
            fields.insert("username".into(), json!(username));
        }
        if let Some(photo_url) = self.photo_url {
            fields.insert("photoURL".into(), json!(photo_url));
        }
        fields.insert("provider".into(), json!(self.provider));
        fields.insert("isOnline".into(), Value::Bool(true));
        fields
    }
}

/// Partial profile update; only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub online: Option<bool>,
}

impl ProfileUpdate {
    pub fn presence(online: bool) -> Self {
        Self {
            online: Some(online),
            ..Self::default()
        }
    }

    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        if let Some(username) = self.username {
            fields.insert("username".into(), json!(username));
        }
        if let Some(bio) = self.bio {
            fields.insert("bio".into(), json!(bio));
        }
        if let Some(photo_url) = self.photo_url {
            fields.insert("photoURL".into(), json!(photo_url));
        }
        if let Some(online) = self.online {
            fields.insert("isOnline".into(), Value::Bool(online));
        }
        fields
    }
}

// -- Messages --

/// Message as submitted by a client. The store assigns the id and `createdAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: String,
    pub time_label: String,
}

impl NewMessage {
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("senderId".into(), json!(self.sender_id.as_str()));
        fields.insert("receiverId".into(), json!(self.receiver_id.as_str()));
        fields.insert("text".into(), json!(self.text));
        fields.insert("time".into(), json!(self.time_label));
        fields
    }
}
