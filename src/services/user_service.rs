//! User service for registration, credentials and sessions.
//!
//! Passwords and tokens go through the `AuthProvider`; sessions, the token
//! blacklist and presence live in the cache and are best effort.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use validator::Validate;

use crate::auth::{AuthProvider, AuthToken, Identity};
use crate::cache::CounterCache;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, UpdateUser, User};
use crate::store::Store;

/// Input for a new account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Profile changes. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: User,
    pub token: AuthToken,
}

/// User service for handling account business logic.
///
/// Cloning is cheap; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    cache: CounterCache,
    auth: Arc<dyn AuthProvider>,
    session_ttl: Duration,
    online_ttl: Duration,
}

impl UserService {
    pub fn new(
        store: Arc<dyn Store>,
        cache: CounterCache,
        auth: Arc<dyn AuthProvider>,
        session_ttl: Duration,
        online_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            auth,
            session_ttl,
            online_ttl,
        }
    }

    /// Registers a new user.
    ///
    /// # Arguments
    /// * `input` - Username, email and plain-text password
    ///
    /// # Returns
    /// The created user, `Validation` for malformed input or `Duplicate`
    /// when the username or email is taken
    pub async fn register(&self, input: RegisterUser) -> AppResult<User> {
        input.validate()?;

        let digest = self.auth.hash(&input.password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                username: input.username,
                email: input.email,
                password: digest,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Checks a username and password pair.
    ///
    /// # Returns
    /// `Some(User)` when the credentials match, `None` otherwise
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Option<User>> {
        let Some(user) = self.store.find_user_by_username(username).await? else {
            return Ok(None);
        };

        if self.auth.verify(password, &user.password).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Logs a user in, records the session and marks the user online.
    ///
    /// # Returns
    /// The user with a freshly issued token, `Unauthorized` for bad
    /// credentials or `Forbidden` for deactivated accounts
    pub async fn login(&self, username: &str, password: &str) -> AppResult<LoginSession> {
        let user = self
            .authenticate(username, password)
            .await?
            .ok_or_else(|| AppError::Unauthorized {
                message: "Incorrect username or password".to_string(),
            })?;

        if !user.is_active {
            return Err(AppError::Forbidden {
                message: "Inactive user".to_string(),
            });
        }

        let token = self.auth.issue_token(&Identity {
            user_id: user.id,
            username: user.username.clone(),
        })?;

        // Sessions never outlive the token they hold.
        let ttl = self.auth.token_ttl().min(self.session_ttl);
        self.cache.set_session(user.id, &token.token, ttl).await;
        self.cache.set_user_online(user.id, self.online_ttl).await;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(LoginSession { user, token })
    }

    /// Revokes a token until it would have expired anyway.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        let verified = self.auth.verify_token(token)?;

        self.cache
            .blacklist_token(token, revocation_ttl(verified.remaining_validity()))
            .await;
        self.cache
            .delete_session(verified.identity.user_id, token)
            .await;

        tracing::info!(user_id = verified.identity.user_id, "User logged out");
        Ok(())
    }

    /// Resolves a bearer token to its active user.
    ///
    /// Blacklisted tokens are rejected before the signature is checked.
    pub async fn authenticate_token(&self, token: &str) -> AppResult<User> {
        if self.cache.is_token_blacklisted(token).await {
            return Err(AppError::Unauthorized {
                message: "Token has been revoked".to_string(),
            });
        }

        let verified = self.auth.verify_token(token)?;
        match self.store.get_user(verified.identity.user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Unauthorized {
                message: "Could not validate credentials".to_string(),
            }),
        }
    }

    /// Gets a user by their ID.
    ///
    /// # Returns
    /// The user if found, or `NotFound` error
    pub async fn get_user(&self, user_id: i32) -> AppResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", user_id))
    }

    pub async fn get_user_by_username(&self, username: &str) -> AppResult<User> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound {
                entity: "user".to_string(),
                field: "username".to_string(),
                value: username.to_string(),
            })
    }

    /// Updates username, email or password.
    ///
    /// # Arguments
    /// * `user_id` - The user's ID
    /// * `changes` - The fields to update
    ///
    /// # Returns
    /// The updated user
    pub async fn update_profile(&self, user_id: i32, changes: ProfileUpdate) -> AppResult<User> {
        changes.validate()?;

        let password = match changes.password {
            Some(ref password) => Some(self.auth.hash(password).await?),
            None => None,
        };
        let update = UpdateUser {
            username: changes.username,
            email: changes.email,
            password,
        };

        if update.is_empty() {
            return self.get_user(user_id).await;
        }
        self.store.update_user(user_id, update).await
    }

    pub async fn is_online(&self, user_id: i32) -> bool {
        self.cache.is_user_online(user_id).await
    }
}

/// Blacklist lifetime for a token with `remaining` validity left.
///
/// A token is still accepted during the second named by its `exp`, which
/// `remaining` rounds down to zero.
pub(crate) fn revocation_ttl(remaining: Duration) -> Duration {
    remaining + Duration::from_secs(1)
}
