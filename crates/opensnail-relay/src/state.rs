use chrono::{DateTime, Utc};
use expiring_blob_store::ExpiringBlobStore;
use std::sync::Arc;

use crate::gateway::UploadGateway;
use crate::identity::{AccessTokenSlot, IdentityProvider};

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ExpiringBlobStore>,
    pub gateway: Arc<UploadGateway>,
    /// `None` when Discord sign-in is not configured
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub access_token: Arc<AccessTokenSlot>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<ExpiringBlobStore>,
        gateway: UploadGateway,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self {
            store,
            gateway: Arc::new(gateway),
            identity,
            access_token: Arc::new(AccessTokenSlot::new()),
            started_at: Utc::now(),
        }
    }
}
