use async_trait::async_trait;

use messenger_types::AuthError;
use messenger_types::api::ProviderAssertion;
use messenger_types::store::IdentityProvider;

/// Identity provider with a fixed outcome, standing in for an interactive
/// sign-in flow. `None` behaves like a user closing the sign-in window.
#[derive(Debug, Clone)]
pub struct StaticProvider {
    name: String,
    outcome: Option<ProviderAssertion>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>, outcome: Option<ProviderAssertion>) -> Self {
        Self {
            name: name.into(),
            outcome,
        }
    }

    /// Provider that vouches for `email`.
    pub fn signed_in(
        name: impl Into<String>,
        email: impl Into<String>,
        display_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Self {
        let name = name.into();
        let outcome = ProviderAssertion {
            provider: name.clone(),
            email: email.into(),
            display_name,
            avatar_url,
        };
        Self::new(name, Some(outcome))
    }

    pub fn cancelled(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }
}

#[async_trait]
impl IdentityProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sign_in(&self) -> Result<ProviderAssertion, AuthError> {
        self.outcome.clone().ok_or(AuthError::ProviderCancelled)
    }
}
