use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use messenger_types::{AuthError, UserId};

/// Session tokens stay valid for 30 days.
const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

pub fn create_token(secret: &str, user_id: &UserId, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Decode and validate a token issued by [`create_token`].
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AuthError::InvalidToken)?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_verifies_with_same_secret_only() {
        let id = UserId::new("u1").unwrap();
        let token = create_token("secret-a", &id, "a@example.com").unwrap();

        let claims = verify_token("secret-a", &token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "a@example.com");

        assert_eq!(
            verify_token("secret-b", &token).unwrap_err(),
            AuthError::InvalidToken
        );
        assert!(verify_token("secret-a", &format!("Bearer {}", token)).is_ok());
        assert!(verify_token("secret-a", "garbage").is_err());
    }
}
