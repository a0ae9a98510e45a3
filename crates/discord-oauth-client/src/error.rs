//! Error types for the Discord OAuth client

use std::fmt;

/// Errors that can occur when talking to Discord
#[derive(Debug)]
pub enum DiscordError {
    /// HTTP request failed
    Http(Box<reqwest::Error>),
    /// Discord answered with a non-success status
    Api { status: u16, message: String },
    /// The client could not be configured
    Config(String),
}

impl fmt::Display for DiscordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "Discord HTTP error: {}", e),
            Self::Api { status, message } => {
                write!(f, "Discord API error ({}): {}", status, message)
            }
            Self::Config(msg) => write!(f, "Discord client configuration error: {}", msg),
        }
    }
}

impl std::error::Error for DiscordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DiscordError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(Box::new(e))
    }
}

/// Result type for Discord client operations
pub type Result<T> = std::result::Result<T, DiscordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = DiscordError::Api {
            status: 400,
            message: "invalid_grant".to_string(),
        };
        assert_eq!(format!("{}", err), "Discord API error (400): invalid_grant");
    }

    #[test]
    fn test_config_error_display() {
        let err = DiscordError::Config("bad base URL".to_string());
        assert!(format!("{}", err).contains("bad base URL"));
    }

    #[test]
    fn test_error_is_debug() {
        let err = DiscordError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
