//! Configuration for the Campus Connect backend.
//!
//! This module provides the [`Config`] struct: where the document store
//! lives, how uploads are checked and forwarded, and who may log in to the
//! admin area.
//!
//! # Example
//!
//! ```rust
//! use campus::config::{Config, HostCredentials};
//! use campus::session::AdminCredentials;
//!
//! let config = Config::new("/var/lib/campus/campus.db")
//!     .with_image_host(HostCredentials::new("demo-cloud", "key", "secret"))
//!     .with_admin(AdminCredentials::plain("admin", "change-me"));
//!
//! assert!(config.image_host.is_configured());
//! ```

use std::fmt;
use std::path::PathBuf;

use crate::media::UploadPolicy;
use crate::session::AdminCredentials;

/// File name of the document store inside the data directory
pub const DATABASE_FILE_NAME: &str = "campus.db";

/// Credentials for the hosted image service.
///
/// All three values must be set for uploads to be accepted.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HostCredentials {
    /// Account (cloud) name
    pub cloud_name: String,
    /// Public API key
    pub api_key: String,
    /// API secret used to sign upload requests
    pub api_secret: String,
}

impl HostCredentials {
    /// Create credentials from the three account values
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Check that every value is present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.trim().is_empty()
            && !self.api_key.trim().is_empty()
            && !self.api_secret.trim().is_empty()
    }
}

impl fmt::Debug for HostCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the Campus Connect backend.
///
/// # Defaults
///
/// - `database_path`: platform data directory + `campus/campus.db`
/// - `image_host`: empty (uploads are refused until configured)
/// - `upload`: [`UploadPolicy::default`] (images only, 10 MB per file)
/// - `admin`: `None` (every login is refused)
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite document store. Created if it doesn't exist.
    pub database_path: PathBuf,

    /// Hosted image service credentials
    pub image_host: HostCredentials,

    /// Per-file upload rules and host transformation settings
    pub upload: UploadPolicy,

    /// Admin login credentials
    pub admin: Option<AdminCredentials>,
}

impl Config {
    /// Create a new configuration with the given database path
    #[must_use]
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            image_host: HostCredentials::default(),
            upload: UploadPolicy::default(),
            admin: None,
        }
    }

    /// Set the image host credentials
    #[must_use]
    pub fn with_image_host(mut self, credentials: HostCredentials) -> Self {
        self.image_host = credentials;
        self
    }

    /// Set the upload policy
    #[must_use]
    pub fn with_upload_policy(mut self, policy: UploadPolicy) -> Self {
        self.upload = policy;
        self
    }

    /// Set the admin credentials
    #[must_use]
    pub fn with_admin(mut self, admin: AdminCredentials) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Get the default database path
    #[must_use]
    pub fn default_database_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("campus")
            .join(DATABASE_FILE_NAME)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_database_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.database_path.ends_with("campus/campus.db"));
        assert!(!config.image_host.is_configured());
        assert!(config.admin.is_none());
        assert_eq!(config.upload.max_bytes, UploadPolicy::default().max_bytes);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new("/tmp/campus.db")
            .with_image_host(HostCredentials::new("cloud", "key", "secret"))
            .with_admin(AdminCredentials::plain("admin", "pw"));

        assert_eq!(config.database_path, PathBuf::from("/tmp/campus.db"));
        assert!(config.image_host.is_configured());
        assert!(config.admin.is_some());
    }

    #[test]
    fn test_partial_host_credentials() {
        assert!(!HostCredentials::new("cloud", "key", "").is_configured());
        assert!(!HostCredentials::new(" ", "key", "secret").is_configured());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = HostCredentials::new("cloud", "key", "very-secret");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
