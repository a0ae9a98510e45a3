//! Discord OAuth2 client
//!
//! Covers the authorization-code grant used to sign a user in with Discord:
//!
//! - building the `/oauth2/authorize` URL the browser is sent to
//! - `POST /api/oauth2/token` - exchange the callback code for an access token
//! - `GET /api/users/@me` - fetch the signed-in user (cached briefly per token)

mod client;
mod error;
mod types;

pub use client::DiscordClient;
pub use error::{DiscordError, Result};
pub use types::{DiscordConfig, DiscordUser, TokenResponse};
