//! Discord OAuth types

use serde::{Deserialize, Serialize};

const CDN_BASE_URL: &str = "https://cdn.discordapp.com";

/// Application credentials registered with Discord
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl DiscordConfig {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes: vec!["identify".to_string()],
        }
    }
}

/// Response from `POST /oauth2/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub scope: String,
}

/// The signed-in user as returned by `GET /users/@me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl DiscordUser {
    /// URL of the user's avatar, falling back to Discord's default avatars
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("{}/avatars/{}/{}.png", CDN_BASE_URL, self.id, hash),
            None => format!(
                "{}/embed/avatars/{}.png",
                CDN_BASE_URL,
                self.default_avatar_index()
            ),
        }
    }

    fn default_avatar_index(&self) -> u64 {
        // Legacy accounts still carry a 4-digit discriminator; migrated
        // accounts report "0" and derive the index from the snowflake.
        match self.discriminator.as_deref().and_then(|d| d.parse::<u64>().ok()) {
            Some(d) if d != 0 => d % 5,
            _ => self.id.parse::<u64>().map(|id| (id >> 22) % 6).unwrap_or(0),
        }
    }
}
