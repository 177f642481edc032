//! Image uploads to the hosted image service
//!
//! Files are checked against an [`UploadPolicy`] as a whole batch before
//! anything is sent, so a rejected batch never reaches the host. Accepted
//! files are uploaded concurrently and their URLs returned in input order.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::future::try_join_all;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::HostCredentials;
use crate::error::UploadError;

/// Largest accepted file, in bytes
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Host folder that uploads are placed in
pub const UPLOAD_FOLDER: &str = "campus-connect";

/// Resize and quality transformation applied by the host
pub const UPLOAD_TRANSFORMATION: &str = "c_limit,w_1200,h_800/q_auto";

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// One uploaded file
#[derive(Debug, Clone)]
pub struct ImageFile {
    /// Client-supplied file name
    pub name: String,
    /// Declared MIME type
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Size in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        is_image_type(&self.content_type)
    }
}

/// True for any `image/*` MIME type
#[must_use]
pub fn is_image_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("image/")
}

/// Rules every uploaded file must pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub folder: String,
    pub transformation: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_IMAGE_BYTES,
            folder: UPLOAD_FOLDER.to_string(),
            transformation: UPLOAD_TRANSFORMATION.to_string(),
        }
    }
}

impl UploadPolicy {
    /// Check a whole batch. The first offending file decides the error.
    pub fn check(&self, files: &[ImageFile]) -> Result<(), UploadError> {
        if files.is_empty() {
            return Err(UploadError::NoFiles);
        }
        for file in files {
            if !file.is_image() {
                return Err(UploadError::InvalidType {
                    file: file.name.as_str().into(),
                    content_type: file.content_type.as_str().into(),
                });
            }
            let size = file.size();
            if size > self.max_bytes {
                return Err(UploadError::TooLarge {
                    file: file.name.as_str().into(),
                    size,
                    limit: self.max_bytes,
                });
            }
        }
        Ok(())
    }
}

/// A service that stores images and hands back their public URL
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload one file and return its HTTPS URL
    async fn upload(&self, file: &ImageFile, policy: &UploadPolicy) -> Result<String, UploadError>;
}

/// Check `files` and upload them all, preserving input order.
///
/// Nothing is uploaded if any file fails the policy. If one upload fails
/// the whole batch fails.
pub async fn upload_images(
    host: &dyn ImageHost,
    policy: &UploadPolicy,
    files: &[ImageFile],
) -> Result<Vec<String>, UploadError> {
    policy.check(files)?;

    let urls = try_join_all(files.iter().map(|file| host.upload(file, policy))).await?;
    info!(count = urls.len(), "Images uploaded");
    Ok(urls)
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<HostErrorBody>,
}

#[derive(Debug, Deserialize)]
struct HostErrorBody {
    message: String,
}

/// Cloudinary-compatible signed upload client
#[derive(Debug, Clone)]
pub struct CloudinaryHost {
    client: reqwest::Client,
    credentials: HostCredentials,
    base_url: String,
}

impl CloudinaryHost {
    /// Create a client for the given account.
    ///
    /// Fails with [`UploadError::NotConfigured`] if any credential is blank.
    pub fn new(credentials: HostCredentials) -> Result<Self, UploadError> {
        if !credentials.is_configured() {
            return Err(UploadError::NotConfigured);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            credentials,
            base_url: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/image/upload", self.base_url, self.credentials.cloud_name)
    }

    /// Sign request parameters.
    ///
    /// Parameters are sorted by name, joined as `k=v` with `&`, suffixed
    /// with the API secret and hashed with SHA-256.
    #[must_use]
    pub fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        let joined = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.credentials.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, file: &ImageFile, policy: &UploadPolicy) -> Result<String, UploadError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("folder", policy.folder.as_str()),
            ("timestamp", timestamp.as_str()),
            ("transformation", policy.transformation.as_str()),
        ]);

        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| UploadError::malformed(format!("bad content type: {e}")))?;

        let form = Form::new()
            .part("file", part)
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", policy.folder.clone())
            .text("transformation", policy.transformation.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        debug!(file = %file.name, size = file.size(), "Uploading image");

        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::host(format!("request failed: {e}")))?;

        let status = response.status();
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::host(format!("unreadable response: {e}")))?;

        if let Some(error) = body.error {
            warn!(file = %file.name, %status, message = %error.message, "Image host rejected upload");
            return Err(UploadError::host(error.message));
        }
        if !status.is_success() {
            return Err(UploadError::host(format!("unexpected status {status}")));
        }
        body.secure_url
            .ok_or_else(|| UploadError::host("response has no secure_url"))
    }
}
