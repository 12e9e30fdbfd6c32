use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use messenger_types::store::DocumentStore;
use messenger_types::{Document, UserProfile};

use crate::error::{ClientError, ClientResult};
use crate::session::Session;

/// Roster entries whose display name (username, else email) contains `query`,
/// ignoring case. An empty query matches everyone; whitespace in the query is
/// matched as typed.
pub fn filter<'a>(roster: &'a [UserProfile], query: &str) -> Vec<&'a UserProfile> {
    let needle = query.to_lowercase();
    roster
        .iter()
        .filter(|p| needle.is_empty() || p.display_name().to_lowercase().contains(&needle))
        .collect()
}

/// The roster of everyone but the current user, cached in the session.
pub struct ContactList {
    store: Arc<dyn DocumentStore>,
    session: Arc<Session>,
}

impl ContactList {
    pub fn new(store: Arc<dyn DocumentStore>, session: Arc<Session>) -> Self {
        Self { store, session }
    }

    /// Fetch every profile and cache all but the current user's.
    pub async fn load(&self) -> ClientResult<Vec<UserProfile>> {
        let me = self.session.current_id().ok_or(ClientError::NotSignedIn)?;

        let docs = self.store.list_profiles().await?;
        let roster: Vec<UserProfile> = docs
            .iter()
            .filter_map(|doc| match UserProfile::try_from(doc) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!("Skipping unreadable profile: {}", e);
                    None
                }
            })
            .filter(|profile| profile.id != me)
            .collect();

        info!("Loaded {} contacts", roster.len());
        self.session.set_roster(roster.clone());
        Ok(roster)
    }

    /// Filter the cached roster; no store access.
    pub fn search(&self, query: &str) -> Vec<UserProfile> {
        let roster = self.session.roster();
        filter(&roster, query).into_iter().cloned().collect()
    }

    /// Contact named exactly `name` (username or email, any case), else the
    /// only contact whose name contains it.
    pub fn find(&self, name: &str) -> Option<UserProfile> {
        let roster = self.session.roster();
        let wanted = name.trim().to_lowercase();

        let exact = roster.iter().find(|p| {
            p.email.to_lowercase() == wanted
                || p.username.as_deref().map(str::to_lowercase).as_deref() == Some(wanted.as_str())
        });
        if let Some(profile) = exact {
            return Some(profile.clone());
        }

        match filter(&roster, &wanted).as_slice() {
            [only] => Some((*only).clone()),
            _ => None,
        }
    }

    /// Fold a profile-change notification into the session. Returns whether
    /// anything cached changed.
    pub fn apply_profile_change(&self, doc: &Document) -> bool {
        apply_change(&self.session, doc)
    }

    /// Keep cached profiles current until `cancel` fires.
    pub async fn follow_changes(&self, cancel: CancellationToken) -> ClientResult<JoinHandle<()>> {
        let mut changes = self.store.subscribe_profiles().await?;
        let session = self.session.clone();

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    doc = changes.next() => match doc {
                        Some(doc) => {
                            apply_change(&session, &doc);
                        }
                        None => break,
                    },
                }
            }
            debug!("Profile watch stopped");
        }))
    }
}

fn apply_change(session: &Session, doc: &Document) -> bool {
    let profile = match UserProfile::try_from(doc) {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Ignoring unreadable profile change: {}", e);
            return false;
        }
    };

    let Some(me) = session.current_id() else {
        debug!("Signed out, ignoring profile change for {}", doc.id);
        return false;
    };
    if me == profile.id {
        session.refresh_profile(profile);
        return false;
    }

    let changed = session.upsert_contact(profile);
    if changed {
        debug!("Roster entry {} updated", doc.id);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use messenger_types::UserId;

    fn contact(id: &str, username: Option<&str>) -> UserProfile {
        UserProfile {
            id: UserId::new(id).unwrap(),
            email: format!("{id}@example.com"),
            username: username.map(str::to_string),
            photo_url: None,
            bio: None,
            provider: None,
            online: false,
            created_at: None,
        }
    }

    fn roster() -> Vec<UserProfile> {
        vec![
            contact("u1", Some("Alice")),
            contact("u2", Some("bob")),
            contact("zed", None),
        ]
    }

    #[test]
    fn empty_query_returns_everyone() {
        let roster = roster();
        assert_eq!(filter(&roster, "").len(), 3);
    }

    #[test]
    fn query_whitespace_is_significant() {
        let roster = roster();
        assert!(filter(&roster, " li").is_empty());
        assert!(filter(&roster, "   ").is_empty());
        assert_eq!(filter(&roster, "li").len(), 1);
    }

    #[test]
    fn no_match_is_empty() {
        assert!(filter(&roster(), "zzz-no-match").is_empty());
    }

    #[test]
    fn matches_ignore_case_and_fall_back_to_email() {
        let roster = roster();
        let hits = filter(&roster, "ALI");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "u1");

        // No username, so the email is what gets searched
        let hits = filter(&roster, "zed@");
        assert_eq!(hits.len(), 1);

        // Emails are not searched when a username exists
        assert!(filter(&roster, "u2@example").is_empty());
    }

    fn profile_doc(id: &str, online: bool) -> Document {
        let serde_json::Value::Object(data) = serde_json::json!({
            "uid": id,
            "email": format!("{id}@example.com"),
            "isOnline": online,
        }) else {
            unreachable!()
        };
        Document::new(messenger_types::document::USERS, id, data)
    }

    #[test]
    fn changes_are_ignored_while_signed_out() {
        let session = Session::new();
        assert!(!apply_change(&session, &profile_doc("u2", true)));
        assert!(session.roster().is_empty());

        session.sign_in(contact("u1", Some("Alice")), "token".into());
        assert!(apply_change(&session, &profile_doc("u2", true)));
        assert_eq!(session.roster().len(), 1);

        session.clear();
        assert!(!apply_change(&session, &profile_doc("u3", true)));
        assert!(session.roster().is_empty());
    }
}
