use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use log::error;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{database::schema::User, Error, HtmlError};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: i32,
    /// Must equal the user's current `token_generation`; logout bumps it.
    pub generation: i32,
    iat: i64,
    exp: i64,
}

impl TokenClaims {
    pub fn new(user: &User, lifetime: Duration) -> Self {
        let now = Utc::now();

        Self {
            user_id: user.id,
            generation: user.token_generation,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        (self.exp - Utc::now().timestamp()).is_negative()
    }
}

/// HMAC-SHA256 signing key shared by every request handler.
#[derive(Clone)]
pub struct TokenKey(Hmac<Sha256>);

impl TokenKey {
    pub fn from_secret(secret: &[u8]) -> Result<Self, Error> {
        Hmac::new_from_slice(secret).map(Self).map_err(|e| {
            error!("Invalid signing secret: {}", e);
            HtmlError::InternalServerError.new("Invalid signing secret")
        })
    }

    /// A key from a fresh random secret. Tokens do not survive a restart.
    pub fn random() -> Result<Self, Error> {
        let secret: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(64)
            .map(char::from)
            .collect();

        Self::from_secret(secret.as_bytes())
    }

    pub fn sign(&self, claims: &TokenClaims) -> Result<String, Error> {
        claims.sign_with_key(&self.0).map_err(|e| {
            error!("Failed to sign token: {}", e);
            HtmlError::InternalServerError.new("Failed to sign token")
        })
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, Error> {
        let claims: TokenClaims = token
            .verify_with_key(&self.0)
            .map_err(|_| HtmlError::Unauthorized.new("Invalid token"))?;

        if claims.is_expired() {
            return Err(HtmlError::Unauthorized.new("Token expired"));
        }

        Ok(claims)
    }
}

pub fn generate_token(user: &User, key: &TokenKey, lifetime: Duration) -> Result<String, Error> {
    key.sign(&TokenClaims::new(user, lifetime))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: "a@b.c".into(),
            username: "a".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password: String::new(),
            avatar: None,
            token_generation: 3,
        }
    }

    #[test]
    fn signed_tokens_verify_with_the_same_key() {
        let key = TokenKey::from_secret(b"secret").unwrap();
        let token = generate_token(&user(), &key, Duration::hours(1)).unwrap();

        let claims = key.verify(&token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.generation, 3);
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let key = TokenKey::from_secret(b"secret").unwrap();
        let other = TokenKey::from_secret(b"other").unwrap();

        let token = generate_token(&user(), &other, Duration::hours(1)).unwrap();
        assert_eq!(key.verify(&token).unwrap_err().code, 401);

        let expired = generate_token(&user(), &key, Duration::hours(-1)).unwrap();
        assert_eq!(key.verify(&expired).unwrap_err().code, 401);
    }
}
