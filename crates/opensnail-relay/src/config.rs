use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use discord_oauth_client::DiscordConfig;
use expiring_blob_store::SweepSchedule;

use crate::constants::{DEFAULT_MAX_UPLOAD_SIZE, DEFAULT_UPLOAD_TTL_SECS, MULTIPART_OVERHEAD};
use crate::error::{RelayError, Result};
use crate::gateway::UploadPolicy;
use crate::server::RouterOptions;

/// Which identifier an upload's download link embeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LinkStyle {
    /// `/api/download/<name>-<code><ext>`
    Full,
    /// `/api/download/tempshare/<code>`
    Short,
}

/// Application configuration, read from flags with environment fallbacks
#[derive(Debug, Clone, Parser)]
#[command(name = "opensnail-relay")]
#[command(about = "Ephemeral file relay for OpenSnail extensions")]
#[command(version)]
pub struct Config {
    /// Port to listen on
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Base URL download links are built from
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:3000")]
    pub public_url: String,

    /// Directory served for every path the API does not handle
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Accepted file extensions, comma-separated
    #[arg(
        long,
        env = "ALLOWED_EXTENSIONS",
        value_delimiter = ',',
        default_value = ".js,.snail"
    )]
    pub allowed_extensions: Vec<String>,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "MAX_UPLOAD_SIZE", default_value_t = DEFAULT_MAX_UPLOAD_SIZE)]
    pub max_upload_size: usize,

    /// Seconds an upload stays downloadable
    #[arg(
        long,
        env = "UPLOAD_TTL_SECS",
        default_value_t = DEFAULT_UPLOAD_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub upload_ttl_secs: u64,

    /// Seconds between eviction sweeps
    #[arg(
        long,
        env = "SWEEP_INTERVAL_SECS",
        default_value_t = DEFAULT_UPLOAD_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_secs: u64,

    /// Whether upload responses link to the full key or the short code
    #[arg(long, env = "LINK_STYLE", value_enum, default_value_t = LinkStyle::Full)]
    pub link_style: LinkStyle,

    /// Allowed CORS origins, comma-separated; `*` allows any
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Discord application id; sign-in is disabled without it
    #[arg(long, env = "DISCORD_CLIENT_ID")]
    pub discord_client_id: Option<String>,

    /// Discord application secret
    #[arg(long, env = "DISCORD_CLIENT_SECRET", hide_env_values = true)]
    pub discord_client_secret: Option<String>,

    /// OAuth redirect URI; defaults to `<public-url>/auth/discord/callback`
    #[arg(long, env = "DISCORD_REDIRECT_URI")]
    pub discord_redirect_uri: Option<String>,
}

impl Config {
    /// Check values clap cannot check on its own
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.public_url)
            .map_err(|e| RelayError::Config(format!("invalid PUBLIC_URL: {}", e)))?;

        if self.upload_policy().allowed_extensions.is_empty() {
            return Err(RelayError::Config(
                "ALLOWED_EXTENSIONS must name at least one extension".to_string(),
            ));
        }

        if self.discord_client_id.is_some() != self.discord_client_secret.is_some() {
            return Err(RelayError::Config(
                "DISCORD_CLIENT_ID and DISCORD_CLIENT_SECRET must be set together".to_string(),
            ));
        }

        Ok(())
    }

    /// Public URL without a trailing slash
    pub fn public_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        let allowed_extensions: HashSet<String> = self
            .allowed_extensions
            .iter()
            .filter_map(|ext| normalize_extension(ext))
            .collect();

        UploadPolicy {
            allowed_extensions,
            max_size: self.max_upload_size,
        }
    }

    pub fn sweep_schedule(&self) -> SweepSchedule {
        SweepSchedule {
            interval: Duration::from_secs(self.sweep_interval_secs),
            ttl: Duration::from_secs(self.upload_ttl_secs),
        }
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            static_dir: self.static_dir.clone(),
            body_limit: self.max_upload_size.saturating_add(MULTIPART_OVERHEAD),
            cors_origins: self.cors_origins.clone(),
        }
    }

    /// Discord credentials, when sign-in is configured
    pub fn discord_config(&self) -> Option<DiscordConfig> {
        let client_id = self.discord_client_id.as_deref()?;
        let client_secret = self.discord_client_secret.as_deref()?;
        let redirect_uri = self
            .discord_redirect_uri
            .clone()
            .unwrap_or_else(|| format!("{}/auth/discord/callback", self.public_url()));

        Some(DiscordConfig::new(client_id, client_secret, &redirect_uri))
    }
}

/// Lowercase an extension and give it a leading dot; blank entries are dropped
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() {
        None
    } else {
        Some(format!(".{}", ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["opensnail-relay"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".js"), Some(".js".to_string()));
        assert_eq!(normalize_extension("JS"), Some(".js".to_string()));
        assert_eq!(normalize_extension(" .Snail "), Some(".snail".to_string()));
        assert_eq!(normalize_extension(""), None);
        assert_eq!(normalize_extension("."), None);
    }

    #[test]
    fn test_explicit_flags() {
        let config = parse(&[
            "--port",
            "8080",
            "--public-url",
            "https://opensnail.example/",
            "--allowed-extensions",
            "JS,.Snail,,txt",
            "--max-upload-size",
            "1024",
            "--upload-ttl-secs",
            "60",
            "--sweep-interval-secs",
            "30",
            "--link-style",
            "short",
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.public_url(), "https://opensnail.example");
        assert_eq!(config.link_style, LinkStyle::Short);

        let policy = config.upload_policy();
        assert_eq!(policy.max_size, 1024);
        assert_eq!(policy.allowed_extensions.len(), 3);
        assert!(policy.allowed_extensions.contains(".js"));
        assert!(policy.allowed_extensions.contains(".snail"));
        assert!(policy.allowed_extensions.contains(".txt"));

        let schedule = config.sweep_schedule();
        assert_eq!(schedule.ttl, Duration::from_secs(60));
        assert_eq!(schedule.interval, Duration::from_secs(30));

        assert_eq!(
            config.router_options().body_limit,
            1024 + MULTIPART_OVERHEAD
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let result = Config::try_parse_from(["opensnail-relay", "--upload-ttl-secs", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_public_url_fails_validation() {
        let config = parse(&["--public-url", "not a url"]);
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));
    }

    #[test]
    fn test_discord_config_requires_both_credentials() {
        let config = parse(&[
            "--public-url",
            "https://opensnail.example",
            "--discord-client-id",
            "123",
        ]);
        assert!(config.discord_config().is_none());
        assert!(config.validate().is_err());

        let config = parse(&[
            "--public-url",
            "https://opensnail.example",
            "--discord-client-id",
            "123",
            "--discord-client-secret",
            "s3cret",
        ]);
        let discord = config.discord_config().unwrap();
        assert_eq!(discord.client_id, "123");
        assert_eq!(
            discord.redirect_uri,
            "https://opensnail.example/auth/discord/callback"
        );
    }

    #[test]
    fn test_explicit_redirect_uri_wins() {
        let config = parse(&[
            "--discord-client-id",
            "123",
            "--discord-client-secret",
            "s3cret",
            "--discord-redirect-uri",
            "http://127.0.0.1:3000/cb",
        ]);
        assert_eq!(
            config.discord_config().unwrap().redirect_uri,
            "http://127.0.0.1:3000/cb"
        );
    }
}
