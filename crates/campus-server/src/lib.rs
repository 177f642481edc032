//! Campus Server library
//!
//! Re-exports the server modules for use by the binary and integration tests.

use std::sync::Arc;

use campus::{
    Actions, AdminCredentials, CloudinaryHost, Config, ImageHost, Store, UploadPolicy, ViewCache,
};
use tracing::warn;

pub mod api;
pub mod gate;

/// Shared application state
pub struct AppState {
    /// Server actions over the document store
    pub actions: Actions,
    /// Image host for uploads. None when credentials are missing.
    pub image_host: Option<Arc<dyn ImageHost>>,
    /// Per-file upload rules
    pub upload_policy: UploadPolicy,
    /// Admin login. None refuses every login.
    pub admin: Option<AdminCredentials>,
}

impl AppState {
    /// Open the store and build the image host from `config`
    pub fn open(config: &Config) -> campus::Result<Self> {
        let store = Arc::new(Store::open(&config.database_path)?);

        let image_host: Option<Arc<dyn ImageHost>> = if config.image_host.is_configured() {
            Some(Arc::new(CloudinaryHost::new(config.image_host.clone())?))
        } else {
            warn!("Image host credentials missing, uploads will be refused");
            None
        };

        Ok(Self {
            actions: Actions::new(store, Arc::new(ViewCache::new())),
            image_host,
            upload_policy: config.upload.clone(),
            admin: config.admin.clone(),
        })
    }
}
