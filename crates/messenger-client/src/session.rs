use std::sync::{PoisonError, RwLock};

use messenger_types::{UserId, UserProfile};

/// The signed-in user together with the token their session can be resumed
/// from.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedInUser {
    pub profile: UserProfile,
    pub token: String,
}

/// Shared client state: who is signed in and the cached roster.
///
/// The identity resolver writes the current user, the contact list writes the
/// roster, and chat panels only read. Locks are never held across an await.
#[derive(Debug, Default)]
pub struct Session {
    user: RwLock<Option<SignedInUser>>,
    roster: RwLock<Vec<UserProfile>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.read_user(|user| user.map(|u| u.profile.clone()))
    }

    pub fn current_id(&self) -> Option<UserId> {
        self.read_user(|user| user.map(|u| u.profile.id.clone()))
    }

    pub fn token(&self) -> Option<String> {
        self.read_user(|user| user.map(|u| u.token.clone()))
    }

    pub fn is_signed_in(&self) -> bool {
        self.read_user(|user| user.is_some())
    }

    pub fn sign_in(&self, profile: UserProfile, token: String) {
        let mut user = self.user.write().unwrap_or_else(PoisonError::into_inner);
        *user = Some(SignedInUser { profile, token });
    }

    /// Replace the current user's profile. Ignored if `profile` belongs to
    /// someone else.
    pub fn refresh_profile(&self, profile: UserProfile) {
        let mut user = self.user.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = user.as_mut() {
            if current.profile.id == profile.id {
                current.profile = profile;
            }
        }
    }

    /// Forget the user and everything cached for them.
    pub fn clear(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.roster
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn roster(&self) -> Vec<UserProfile> {
        self.roster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_roster(&self, roster: Vec<UserProfile>) {
        *self.roster.write().unwrap_or_else(PoisonError::into_inner) = roster;
    }

    /// Update a cached roster entry in place, appending unknown contacts.
    /// The current user is never added. Returns whether the roster changed.
    pub fn upsert_contact(&self, profile: UserProfile) -> bool {
        if self.current_id().as_ref() == Some(&profile.id) {
            return false;
        }

        let mut roster = self.roster.write().unwrap_or_else(PoisonError::into_inner);
        match roster.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) if *existing == profile => false,
            Some(existing) => {
                *existing = profile;
                true
            }
            None => {
                roster.push(profile);
                true
            }
        }
    }

    fn read_user<T>(&self, f: impl FnOnce(Option<&SignedInUser>) -> T) -> T {
        let user = self.user.read().unwrap_or_else(PoisonError::into_inner);
        f(user.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, username: &str) -> UserProfile {
        UserProfile {
            id: UserId::new(id).unwrap(),
            email: format!("{id}@example.com"),
            username: Some(username.into()),
            photo_url: None,
            bio: None,
            provider: None,
            online: false,
            created_at: None,
        }
    }

    #[test]
    fn sign_in_and_clear() {
        let session = Session::new();
        assert!(!session.is_signed_in());

        session.sign_in(profile("u1", "alice"), "tok".into());
        session.set_roster(vec![profile("u2", "bob")]);
        assert_eq!(session.current_id().unwrap().as_str(), "u1");
        assert_eq!(session.token().as_deref(), Some("tok"));

        session.clear();
        assert!(session.current_user().is_none());
        assert!(session.roster().is_empty());
    }

    #[test]
    fn upsert_skips_self_and_updates_in_place() {
        let session = Session::new();
        session.sign_in(profile("u1", "alice"), "tok".into());
        session.set_roster(vec![profile("u2", "bob"), profile("u3", "carol")]);

        assert!(!session.upsert_contact(profile("u1", "alice2")));

        let mut bob = profile("u2", "bob");
        bob.online = true;
        assert!(session.upsert_contact(bob.clone()));
        assert!(!session.upsert_contact(bob));

        let roster = session.roster();
        assert_eq!(roster.len(), 2);
        assert!(roster[0].online);
        assert_eq!(roster[1].username.as_deref(), Some("carol"));

        assert!(session.upsert_contact(profile("u4", "dave")));
        assert_eq!(session.roster().len(), 3);
    }

    #[test]
    fn refresh_ignores_other_users() {
        let session = Session::new();
        session.sign_in(profile("u1", "alice"), "tok".into());

        session.refresh_profile(profile("u2", "mallory"));
        assert_eq!(session.current_user().unwrap().username.as_deref(), Some("alice"));

        session.refresh_profile(profile("u1", "alicia"));
        assert_eq!(session.current_user().unwrap().username.as_deref(), Some("alicia"));
    }
}
