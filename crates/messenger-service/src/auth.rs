use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use messenger_db::models::CredentialRow;
use messenger_types::api::{AuthIdentity, PASSWORD_PROVIDER, ProviderAssertion};
use messenger_types::store::AuthService;
use messenger_types::{AuthError, StoreError, UserId};

use crate::LocalBackend;
use crate::token::{create_token, verify_token};

#[async_trait]
impl AuthService for LocalBackend {
    async fn register(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let email = normalize_email(email);

        if self.credential_by_email(&email).await?.is_some() {
            return Err(AuthError::AlreadyRegistered(email));
        }

        let user_id = new_user_id()?;
        let id = user_id.to_string();
        let stored_email = email.clone();
        let password = password.to_string();
        self.blocking(move |db| {
            // Hash password with Argon2id
            let salt = SaltString::generate(&mut OsRng);
            let hash = Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
                .to_string();
            db.create_credential(&id, &stored_email, Some(&hash), PASSWORD_PROVIDER)
        })
        .await
        .map_err(unavailable)?;

        info!("Registered {} as {}", email, user_id);
        self.identity(user_id, email, None, None)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthIdentity, AuthError> {
        let email = normalize_email(email);

        let credential = self
            .credential_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(email.clone()))?;

        // Provider-only accounts have no password to check
        let Some(stored_hash) = credential.password.clone() else {
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let verified = self
            .blocking(move |_| {
                let parsed = PasswordHash::new(&stored_hash)
                    .map_err(|e| anyhow::anyhow!("corrupt password hash: {}", e))?;
                Ok(Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok())
            })
            .await
            .map_err(unavailable)?;

        if !verified {
            warn!("Failed sign-in for {}", email);
            return Err(AuthError::InvalidCredentials);
        }

        let user_id = credential_user_id(&credential)?;
        info!("{} signed in", user_id);
        self.identity(user_id, credential.email, None, None)
    }

    async fn authenticate_with_provider(
        &self,
        assertion: ProviderAssertion,
    ) -> Result<AuthIdentity, AuthError> {
        let email = normalize_email(&assertion.email);

        let user_id = match self.credential_by_email(&email).await? {
            Some(credential) => credential_user_id(&credential)?,
            None => {
                let user_id = new_user_id()?;
                let id = user_id.to_string();
                let stored_email = email.clone();
                let provider = assertion.provider.clone();
                self.blocking(move |db| db.create_credential(&id, &stored_email, None, &provider))
                    .await
                    .map_err(unavailable)?;
                info!("Created {} account {} for {}", assertion.provider, user_id, email);
                user_id
            }
        };

        info!("{} signed in with {}", user_id, assertion.provider);
        self.identity(user_id, email, assertion.display_name, assertion.avatar_url)
    }

    async fn resume(&self, token: &str) -> Result<AuthIdentity, AuthError> {
        let claims = verify_token(&self.jwt_secret, token)?;

        let id = claims.sub.clone();
        let credential = self
            .blocking(move |db| db.get_credential_by_id(&id))
            .await
            .map_err(unavailable)?
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthIdentity {
            id: credential_user_id(&credential)?,
            email: credential.email,
            display_name: None,
            avatar_url: None,
            token: token.to_string(),
        })
    }

    async fn sign_out(&self, id: &UserId) -> Result<(), AuthError> {
        // Tokens are stateless; the client forgets its copy.
        info!("{} signed out", id);
        Ok(())
    }
}

impl LocalBackend {
    async fn credential_by_email(&self, email: &str) -> Result<Option<CredentialRow>, AuthError> {
        let email = email.to_string();
        self.blocking(move |db| db.get_credential_by_email(&email))
            .await
            .map_err(unavailable)
    }

    fn identity(
        &self,
        id: UserId,
        email: String,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<AuthIdentity, AuthError> {
        let token = create_token(&self.jwt_secret, &id, &email)
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        Ok(AuthIdentity {
            id,
            email,
            display_name,
            avatar_url,
            token,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_user_id() -> Result<UserId, AuthError> {
    UserId::new(Uuid::new_v4().simple().to_string())
        .ok_or_else(|| AuthError::Unavailable("generated an invalid user id".into()))
}

fn credential_user_id(credential: &CredentialRow) -> Result<UserId, AuthError> {
    UserId::new(credential.id.as_str()).ok_or_else(|| {
        warn!("Corrupt credential id '{}'", credential.id);
        AuthError::Unavailable(format!("corrupt credential id {:?}", credential.id))
    })
}

fn unavailable(err: StoreError) -> AuthError {
    AuthError::Unavailable(err.to_string())
}
