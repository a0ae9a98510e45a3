//! OpenSnail relay - ephemeral file relay for OpenSnail extensions
//!
//! Accepts extension uploads, hands back a short-lived download link and
//! forgets the file once its time-to-live has passed. Optionally signs a
//! user in with Discord.

mod config;
mod constants;
mod error;
mod gateway;
mod identity;
mod routes;
mod server;
mod state;
mod types;

use crate::config::Config;
use crate::error::Result;
use crate::gateway::UploadGateway;
use crate::identity::IdentityProvider;
use crate::server::{create_router, start_server};
use crate::state::AppState;
use clap::Parser;
use discord_oauth_client::DiscordClient;
use expiring_blob_store::{ExpiringBlobStore, Sweeper};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("opensnail_relay=info".parse()?)
        .add_directive("expiring_blob_store=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting OpenSnail relay...");

    let config = Config::parse();
    config.validate()?;
    info!("Port: {}", config.port);
    info!("Public URL: {}", config.public_url());
    info!("Static dir: {:?}", config.static_dir);
    info!("Allowed extensions: {:?}", config.allowed_extensions);
    info!("Max upload size: {} bytes", config.max_upload_size);
    info!("Upload TTL: {} seconds", config.upload_ttl_secs);

    let identity: Option<Arc<dyn IdentityProvider>> = match config.discord_config() {
        Some(discord) => {
            info!(redirect_uri = %discord.redirect_uri, "Discord sign-in enabled");
            Some(Arc::new(DiscordClient::new(discord)?))
        }
        None => {
            info!("Discord sign-in disabled (no DISCORD_CLIENT_ID/DISCORD_CLIENT_SECRET)");
            None
        }
    };

    let store = Arc::new(ExpiringBlobStore::new());
    let sweeper = Sweeper::start(store.clone(), config.sweep_schedule());

    let gateway = UploadGateway::new(
        store.clone(),
        config.upload_policy(),
        config.public_url(),
        config.link_style,
    );
    let state = AppState::new(store, gateway, identity);
    let router = create_router(state, config.router_options());

    // Serve until shutdown, then stop sweeping
    let served = start_server(router, config.port).await;
    sweeper.stop().await;
    served?;

    info!("OpenSnail relay stopped");
    Ok(())
}
