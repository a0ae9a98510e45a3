//! Upload validation and download link composition
//!
//! Sits between the HTTP handlers and the blob store: checks the upload form,
//! picks the storage key and turns store hits into download URLs.

use bytes::Bytes;
use expiring_blob_store::{ExpiringBlobStore, Instant, ShortCode};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::LinkStyle;

/// What the gateway accepts
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Lowercase extensions with a leading dot
    pub allowed_extensions: HashSet<String>,
    pub max_size: usize,
}

impl UploadPolicy {
    /// Case-insensitive allowlist check
    pub fn allows(&self, ext: &str) -> bool {
        self.allowed_extensions.contains(&ext.to_ascii_lowercase())
    }

    fn allowed_list(&self) -> Vec<String> {
        let mut allowed: Vec<String> = self.allowed_extensions.iter().cloned().collect();
        allowed.sort();
        allowed
    }
}

/// Fields pulled out of an upload request
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub original_filename: Option<String>,
    pub declared_name: Option<String>,
    pub payload: Option<Bytes>,
}

/// A stored upload ready to be sent back
#[derive(Debug, Clone)]
pub struct Retrieved {
    pub payload: Bytes,
    /// Stored key, used as the attachment filename
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    MissingField,
    InvalidName { character: char },
    UnsupportedExtension { extension: String, allowed: Vec<String> },
    PayloadTooLarge { size: usize, max: usize },
    NotFound,
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::MissingField => write!(f, "No file or extension name provided."),
            UploadError::InvalidName { character } if character.is_whitespace() => {
                write!(f, "Extension name cannot contain spaces.")
            }
            UploadError::InvalidName { character } => {
                write!(f, "Extension name cannot contain {:?}.", character)
            }
            UploadError::UnsupportedExtension { extension, allowed } => {
                let extension = if extension.is_empty() {
                    "(none)"
                } else {
                    extension.as_str()
                };
                write!(
                    f,
                    "Unsupported file extension {}. Allowed: {}.",
                    extension,
                    allowed.join(", ")
                )
            }
            UploadError::PayloadTooLarge { size, max } => {
                write!(f, "File is {} bytes; the limit is {} bytes.", size, max)
            }
            UploadError::NotFound => write!(f, "File not found."),
        }
    }
}

impl std::error::Error for UploadError {}

/// Validates uploads before they reach the store and shapes store results
/// for the HTTP layer
pub struct UploadGateway {
    store: Arc<ExpiringBlobStore>,
    policy: UploadPolicy,
    public_url: String,
    link_style: LinkStyle,
}

impl UploadGateway {
    pub fn new(
        store: Arc<ExpiringBlobStore>,
        policy: UploadPolicy,
        public_url: &str,
        link_style: LinkStyle,
    ) -> Self {
        Self {
            store,
            policy,
            public_url: public_url.trim_end_matches('/').to_string(),
            link_style,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Validate an upload, store it and return its download URL.
    ///
    /// Every check runs before the store is touched, so a rejected upload
    /// leaves it unchanged.
    pub async fn accept(&self, form: UploadForm) -> Result<String, UploadError> {
        let (payload, name) = match (form.payload, form.declared_name) {
            (Some(payload), Some(name)) if !name.is_empty() => (payload, name),
            _ => return Err(UploadError::MissingField),
        };

        validate_name(&name)?;

        let extension = form
            .original_filename
            .as_deref()
            .and_then(extension_of)
            .unwrap_or_default();
        if !self.policy.allows(&extension) {
            debug!(name = %name, extension = %extension, "Rejected upload extension");
            return Err(UploadError::UnsupportedExtension {
                extension,
                allowed: self.policy.allowed_list(),
            });
        }

        if payload.len() > self.policy.max_size {
            debug!(name = %name, size = payload.len(), "Rejected oversized upload");
            return Err(UploadError::PayloadTooLarge {
                size: payload.len(),
                max: self.policy.max_size,
            });
        }

        let size = payload.len();
        let code = ShortCode::generate();
        let key = self
            .store
            .put_with_code(&name, &extension, code, payload, Instant::now())
            .await;
        info!(key = %key, size, "Accepted upload");

        Ok(match self.link_style {
            LinkStyle::Full => self.download_url(&key),
            LinkStyle::Short => self.short_url(code),
        })
    }

    /// Look an upload up by full key, or by short code when `by_code` is set
    pub async fn retrieve(&self, identifier: &str, by_code: bool) -> Result<Retrieved, UploadError> {
        let record = if by_code {
            self.store.get_by_code(identifier).await
        } else {
            self.store.get(identifier).await
        };

        record
            .map(|record| Retrieved {
                payload: record.payload.clone(),
                filename: record.key.clone(),
            })
            .ok_or(UploadError::NotFound)
    }

    /// Link that downloads the bytes stored under `key`
    pub fn download_url(&self, key: &str) -> String {
        format!(
            "{}/api/download/{}",
            self.public_url,
            urlencoding::encode(key)
        )
    }

    /// Link that resolves a short code to the full download link
    pub fn short_url(&self, code: ShortCode) -> String {
        format!("{}/api/download/tempshare/{}", self.public_url, code)
    }
}

/// Names end up in a URL path segment and an attachment filename
fn validate_name(name: &str) -> Result<(), UploadError> {
    match name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\' | '"'))
    {
        Some(character) => Err(UploadError::InvalidName { character }),
        None => Ok(()),
    }
}

/// Extension of a filename with its leading dot, case preserved
fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
}
