//! Sign-in identity: the provider seam and the shared access token
//!
//! The relay keeps exactly one access token for the whole process. Whoever
//! completes the OAuth callback last is the identity every caller of
//! `/api/userdata` sees. This matches the single-user tool the relay was
//! built for and is not suitable for multi-user sessions.

use async_trait::async_trait;
use discord_oauth_client::{DiscordClient, DiscordError};
use serde::Serialize;
use std::fmt;
use tokio::sync::RwLock;

/// Profile fields handed to the client extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub profile_picture: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The provider refused the code or token
    Rejected(String),
    /// The provider could not be reached or answered unexpectedly
    Unavailable(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Rejected(msg) => write!(f, "Sign-in rejected: {}", msg),
            IdentityError::Unavailable(msg) => write!(f, "Identity provider unavailable: {}", msg),
        }
    }
}

impl std::error::Error for IdentityError {}

/// OAuth2 authorization-code provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start sign-in
    fn authorize_url(&self) -> String;

    /// Trade the callback code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, IdentityError>;
}

#[async_trait]
impl IdentityProvider for DiscordClient {
    fn authorize_url(&self) -> String {
        DiscordClient::authorize_url(self, None)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, IdentityError> {
        let token = DiscordClient::exchange_code(self, code).await?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, IdentityError> {
        let user = self.current_user(access_token).await?;
        Ok(UserProfile {
            profile_picture: user.avatar_url(),
            username: user.username,
        })
    }
}

impl From<DiscordError> for IdentityError {
    fn from(err: DiscordError) -> Self {
        match err {
            DiscordError::Api { status, message } if (400..500).contains(&status) => {
                IdentityError::Rejected(message)
            }
            other => IdentityError::Unavailable(other.to_string()),
        }
    }
}

/// Process-wide access token, latest write wins
#[derive(Debug, Default)]
pub struct AccessTokenSlot {
    token: RwLock<Option<String>>,
}

impl AccessTokenSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Empty the slot, returning whether it held a token
    pub async fn clear(&self) -> bool {
        self.token.write().await.take().is_some()
    }
}
