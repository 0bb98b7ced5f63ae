//! Password hashing and token issuance behind a narrow capability.

pub mod jwt;
pub mod password;

use std::time::Duration;

use argon2::Argon2;
use async_trait::async_trait;

use crate::config::settings::JwtConfig;
use crate::error::{AppError, AppResult};

/// Who a token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
}

/// A freshly minted or successfully verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub identity: Identity,
    pub expires_at: jiff::Timestamp,
}

impl AuthToken {
    /// Time left before expiry, zero once expired.
    pub fn remaining_validity(&self) -> Duration {
        let remaining = self.expires_at.as_second() - jiff::Timestamp::now().as_second();
        Duration::from_secs(remaining.max(0) as u64)
    }
}

/// Credential capability used by the user service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn hash(&self, password: &str) -> AppResult<String>;

    async fn verify(&self, password: &str, digest: &str) -> AppResult<bool>;

    fn issue_token(&self, identity: &Identity) -> AppResult<AuthToken>;

    /// Fails with `AppError::Unauthorized` for bad signatures and expired tokens.
    fn verify_token(&self, token: &str) -> AppResult<AuthToken>;

    /// Lifetime of newly issued tokens.
    fn token_ttl(&self) -> Duration;
}

/// Argon2id digests and HS256 JWTs.
#[derive(Clone)]
pub struct JwtAuthProvider {
    secret: String,
    ttl_seconds: u64,
    argon2: Argon2<'static>,
}

impl JwtAuthProvider {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            ttl_seconds: config.access_token_ttl_seconds(),
            argon2: password::default_hasher(),
        }
    }

    /// Use a different Argon2 configuration, e.g. cheaper parameters in tests.
    pub fn with_hasher(mut self, argon2: Argon2<'static>) -> Self {
        self.argon2 = argon2;
        self
    }

    fn to_auth_token(token: String, claims: &jwt::Claims) -> AppResult<AuthToken> {
        let expires_at =
            jiff::Timestamp::from_second(claims.exp).map_err(|e| AppError::Unauthorized {
                message: format!("Invalid token expiry: {}", e),
            })?;
        Ok(AuthToken {
            token,
            identity: Identity {
                user_id: claims.user_id()?,
                username: claims.username.clone(),
            },
            expires_at,
        })
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn hash(&self, password: &str) -> AppResult<String> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || password::hash_password(&argon2, &password))
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?
    }

    async fn verify(&self, password: &str, digest: &str) -> AppResult<bool> {
        let argon2 = self.argon2.clone();
        let password = password.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || password::verify_password(&argon2, &password, &digest))
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?
    }

    fn issue_token(&self, identity: &Identity) -> AppResult<AuthToken> {
        let ttl = i64::try_from(self.ttl_seconds).unwrap_or(i64::MAX);
        let claims = jwt::Claims::new(identity.user_id, identity.username.clone(), ttl);
        let token = jwt::encode_claims(&claims, &self.secret)?;
        Self::to_auth_token(token, &claims)
    }

    fn verify_token(&self, token: &str) -> AppResult<AuthToken> {
        let claims = jwt::decode_claims(token, &self.secret)?;
        Self::to_auth_token(token.to_string(), &claims)
    }

    fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[cfg(test)]
pub(crate) fn test_provider() -> JwtAuthProvider {
    let config = JwtConfig {
        secret: "test_secret_key_for_jwt_testing_0123456789".to_string(),
        access_token_expiration: 30,
    };
    let cheap = password::hasher_with_params(8, 1, 1).expect("valid argon2 params");
    JwtAuthProvider::new(&config).with_hasher(cheap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let provider = test_provider();
        let digest = provider.hash("secret1").await.unwrap();
        assert!(provider.verify("secret1", &digest).await.unwrap());
        assert!(!provider.verify("secret2", &digest).await.unwrap());
    }

    #[test]
    fn test_issue_and_verify_token() {
        let provider = test_provider();
        let identity = Identity {
            user_id: 7,
            username: "bob".to_string(),
        };

        let issued = provider.issue_token(&identity).unwrap();
        let verified = provider.verify_token(&issued.token).unwrap();
        assert_eq!(verified, issued);
        assert_eq!(provider.token_ttl(), Duration::from_secs(1800));

        let remaining = verified.remaining_validity();
        assert!(remaining <= Duration::from_secs(1800));
        assert!(remaining >= Duration::from_secs(1790));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let provider = test_provider();
        let issued = provider
            .issue_token(&Identity {
                user_id: 1,
                username: "a".to_string(),
            })
            .unwrap();
        let tampered = format!("{}x", issued.token);
        assert!(matches!(
            provider.verify_token(&tampered),
            Err(AppError::Unauthorized { .. })
        ));
    }
}
