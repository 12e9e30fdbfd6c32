use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use messenger_types::api::{AuthIdentity, NewProfile, PASSWORD_PROVIDER, ProfileUpdate};
use messenger_types::document::USERS;
use messenger_types::store::{AuthService, DocumentStore, IdentityProvider};
use messenger_types::{AuthError, StoreError, UserId, UserProfile};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, ValidationErrors};
use crate::session::Session;
use crate::validation::{LoginForm, ProfileForm, RegisterForm};

/// Turns sign-in results into a populated [`Session`] and keeps the user's
/// profile document in step with it.
pub struct IdentityResolver {
    auth: Arc<dyn AuthService>,
    store: Arc<dyn DocumentStore>,
    session: Arc<Session>,
    config: ClientConfig,
}

impl IdentityResolver {
    pub fn new(
        auth: Arc<dyn AuthService>,
        store: Arc<dyn DocumentStore>,
        session: Arc<Session>,
        config: ClientConfig,
    ) -> Self {
        Self {
            auth,
            store,
            session,
            config,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn register(&self, form: &RegisterForm) -> ClientResult<UserProfile> {
        form.validate()?;

        let identity = match self.auth.register(&form.email, &form.password).await {
            Ok(identity) => identity,
            Err(AuthError::AlreadyRegistered(email)) => {
                debug!("Registration refused, {} already exists", email);
                return Err(ValidationErrors::single("email", "Email already registered").into());
            }
            Err(e) => {
                warn!("Registration failed: {}", e);
                return Err(e.into());
            }
        };

        let username = form.username.trim();
        let profile = NewProfile {
            id: identity.id.clone(),
            email: identity.email.clone(),
            username: Some(username.to_string()),
            photo_url: Some(self.config.default_avatar(username)),
            provider: PASSWORD_PROVIDER.to_string(),
        };
        self.store.put_profile(&identity.id, profile.into_fields()).await?;

        self.establish(identity).await
    }

    pub async fn login(&self, form: &LoginForm) -> ClientResult<UserProfile> {
        form.validate()?;

        let identity = self
            .auth
            .authenticate(form.email.trim(), &form.password)
            .await
            .inspect_err(|e| warn!("Sign-in failed: {}", e))?;

        self.mark_online(&identity, PASSWORD_PROVIDER).await?;
        self.establish(identity).await
    }

    /// Run the provider's sign-in flow. The first sign-in creates the account
    /// and its profile from what the provider vouches for.
    pub async fn login_with_provider(
        &self,
        provider: &dyn IdentityProvider,
    ) -> ClientResult<UserProfile> {
        let assertion = provider
            .sign_in()
            .await
            .inspect_err(|e| info!("{} sign-in did not complete: {}", provider.name(), e))?;

        let identity = self.auth.authenticate_with_provider(assertion).await?;
        self.mark_online(&identity, provider.name()).await?;
        self.establish(identity).await
    }

    /// Resume a session from a token issued by an earlier sign-in.
    pub async fn restore(&self, token: &str) -> ClientResult<UserProfile> {
        let identity = self.auth.resume(token).await?;
        self.mark_online(&identity, PASSWORD_PROVIDER).await?;
        self.establish(identity).await
    }

    pub async fn logout(&self) -> ClientResult<()> {
        let id = self.require_user()?;

        self.store
            .update_profile(&id, ProfileUpdate::presence(false).into_fields())
            .await?;
        self.auth.sign_out(&id).await?;

        self.session.clear();
        info!("{} logged out", id);
        Ok(())
    }

    /// Re-read the current user's profile and refresh the session copy.
    pub async fn load_profile(&self) -> ClientResult<UserProfile> {
        let id = self.require_user()?;
        let profile = self.fetch_profile(&id).await?;
        self.session.refresh_profile(profile.clone());
        Ok(profile)
    }

    /// Profile form prefilled with the stored values.
    pub async fn profile_form(&self) -> ClientResult<ProfileForm> {
        let profile = self.load_profile().await?;
        Ok(ProfileForm {
            username: profile.username.unwrap_or_default(),
            bio: profile.bio.unwrap_or_default(),
            photo_url: profile.photo_url.unwrap_or_default(),
        })
    }

    pub async fn update_profile(&self, form: &ProfileForm) -> ClientResult<UserProfile> {
        let id = self.require_user()?;
        form.validate()?;

        let username = form.username.trim();
        let taken = self
            .store
            .find_profiles("username", &json!(username))
            .await?
            .iter()
            .any(|doc| doc.id != id.as_str());
        if taken {
            return Err(ValidationErrors::single("username", "Username already in use").into());
        }

        let update = ProfileUpdate {
            username: Some(username.to_string()),
            bio: Some(form.bio.trim().to_string()),
            photo_url: Some(form.photo_url.trim().to_string()),
            online: None,
        };
        self.store.update_profile(&id, update.into_fields()).await?;

        info!("{} updated their profile", id);
        self.load_profile().await
    }

    fn require_user(&self) -> ClientResult<UserId> {
        self.session.current_id().ok_or(ClientError::NotSignedIn)
    }

    /// Set `isOnline`, writing a minimal profile first if the account has none.
    async fn mark_online(&self, identity: &AuthIdentity, provider: &str) -> ClientResult<()> {
        if self.store.get_profile(&identity.id).await?.is_some() {
            self.store
                .update_profile(&identity.id, ProfileUpdate::presence(true).into_fields())
                .await?;
            return Ok(());
        }

        debug!("No profile for {}, creating one", identity.id);
        let profile = NewProfile {
            id: identity.id.clone(),
            email: identity.email.clone(),
            username: identity.display_name.clone(),
            photo_url: identity.avatar_url.clone(),
            provider: provider.to_string(),
        };
        self.store.put_profile(&identity.id, profile.into_fields()).await?;
        Ok(())
    }

    async fn establish(&self, identity: AuthIdentity) -> ClientResult<UserProfile> {
        let profile = self.fetch_profile(&identity.id).await?;
        self.session.sign_in(profile.clone(), identity.token);
        info!("Signed in as {} ({})", profile.display_name(), profile.id);
        Ok(profile)
    }

    async fn fetch_profile(&self, id: &UserId) -> ClientResult<UserProfile> {
        let doc = self
            .store
            .get_profile(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", USERS, id)))?;
        Ok(UserProfile::try_from(&doc)?)
    }
}
