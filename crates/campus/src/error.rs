//! Error types for Campus Connect.
//!
//! This module defines the [`enum@Error`] enum and [`Result`] type alias used throughout
//! the library, plus the typed storage and upload error kinds it wraps.
//!
//! # Error Categories
//!
//! - [`Error::Config`] - A required service is not configured
//! - [`Error::Validation`] - Form input rejected before any write
//! - [`Error::Store`] - Document store failures ([`StoreError`])
//! - [`Error::Upload`] - Image upload failures ([`UploadError`])
//! - [`Error::Unauthorized`] - Admin login rejected
//!
//! User-facing text comes from [`Error::user_message`], which matches on the
//! error kind. Callers never need to inspect the `Display` output to decide
//! what to show.
//!
//! # Example
//!
//! ```rust
//! use campus::{Error, StoreError, CollectionName};
//!
//! let err = Error::from(StoreError::Conflict {
//!     collection: CollectionName::AcademicYears,
//!     key: "2024-2025".into(),
//! });
//! assert_eq!(err.user_message(), "Academic year \"2024-2025\" already exists.");
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::models::CollectionName;

/// Result type alias for Campus Connect operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Campus Connect operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A service the operation needs is not configured
    #[error("configuration error: {0}")]
    Config(Arc<str>),

    /// Submitted form data failed validation; nothing was written
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Document store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Image upload failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Admin credentials did not match
    #[error("invalid username or password")]
    Unauthorized,
}

impl Error {
    /// Create a configuration error
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(Arc::from(msg.into()))
    }

    /// The message shown to an admin or visitor for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(_) => "Service not configured. Please contact administrator.".to_string(),
            Self::Validation(errors) => format!("Validation failed: {errors}"),
            Self::Store(err) => err.user_message(),
            Self::Upload(err) => err.user_message(),
            Self::Unauthorized => "Invalid username or password.".to_string(),
        }
    }

    /// Field errors carried by a validation failure, empty otherwise.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors.as_slice(),
            _ => &[],
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// A single rejected form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name, as submitted (`title`, `academicYear`, ...)
    pub field: &'static str,
    /// Human-readable reason
    pub message: String,
}

/// The list of field errors from one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Create an empty error list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rejected field
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// True when no field was rejected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The rejected fields in the order they were checked
    #[must_use]
    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    /// Whether the given field was rejected
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` if nothing was rejected, otherwise the collected errors
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&err.message)?;
        }
        Ok(())
    }
}

/// Errors raised by the document store
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// A unique key already exists in the collection
    #[error("duplicate {} key: {key}", .collection.as_str())]
    Conflict {
        /// Collection that rejected the insert
        collection: CollectionName,
        /// The duplicated value
        key: Arc<str>,
    },

    /// The id could not be parsed as a document id
    #[error("invalid {} id: {id}", .collection.as_str())]
    InvalidId {
        /// Collection the id was meant for
        collection: CollectionName,
        /// The rejected id text
        id: Arc<str>,
    },

    /// No document with this id exists
    #[error("{} {id} not found", .collection.as_str())]
    NotFound {
        /// Collection that was searched
        collection: CollectionName,
        /// The missing id
        id: Arc<str>,
    },

    /// The document violates a collection schema rule
    #[error("schema violation in {}: {message}", .collection.as_str())]
    Schema {
        /// Collection whose schema rejected the document
        collection: CollectionName,
        /// Joined rule violations
        message: Arc<str>,
    },

    /// The database could not be opened or queried
    #[error("database error: {0}")]
    Connection(Arc<str>),

    /// A stored document could not be decoded
    #[error("corrupt document: {0}")]
    Corrupt(Arc<str>),
}

impl StoreError {
    /// Create a connection error
    #[inline]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(Arc::from(msg.into()))
    }

    /// Create a corrupt-document error
    #[inline]
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(Arc::from(msg.into()))
    }

    /// Create a not-found error
    #[inline]
    pub fn not_found(collection: CollectionName, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection,
            id: Arc::from(id.into()),
        }
    }

    /// Create an invalid-id error
    #[inline]
    pub fn invalid_id(collection: CollectionName, id: impl Into<String>) -> Self {
        Self::InvalidId {
            collection,
            id: Arc::from(id.into()),
        }
    }

    /// The message shown to the admin for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Conflict { collection, key } => {
                format!("{} \"{key}\" already exists.", capitalize(collection.label()))
            }
            Self::InvalidId { collection, .. } => {
                format!("Invalid {} ID format", collection.label())
            }
            Self::NotFound { collection, .. } => {
                format!("{} not found", capitalize(collection.label()))
            }
            Self::Schema { message, .. } => format!("Database validation failed: {message}"),
            Self::Connection(_) => "Database connection failed. Please try again later.".to_string(),
            Self::Corrupt(_) => {
                "Stored data could not be read. Please contact administrator.".to_string()
            }
        }
    }
}

/// Errors raised while accepting or forwarding image uploads
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    /// The request carried no files
    #[error("no files provided")]
    NoFiles,

    /// A file is not an image
    #[error("invalid file type for {file}: {content_type}")]
    InvalidType {
        /// Offending file name
        file: Arc<str>,
        /// The declared MIME type
        content_type: Arc<str>,
    },

    /// A file exceeds the size limit
    #[error("file {file} is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Offending file name
        file: Arc<str>,
        /// Actual size in bytes
        size: u64,
        /// Maximum allowed size in bytes
        limit: u64,
    },

    /// Image host credentials are missing
    #[error("image upload service not configured")]
    NotConfigured,

    /// The image host rejected the upload or could not be reached
    #[error("image host error: {0}")]
    Host(Arc<str>),

    /// The multipart body could not be read
    #[error("malformed upload request: {0}")]
    Malformed(Arc<str>),
}

impl UploadError {
    /// Create an image host error
    #[inline]
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(Arc::from(msg.into()))
    }

    /// Create a malformed-request error
    #[inline]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(Arc::from(msg.into()))
    }

    /// True when the request itself was at fault
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NoFiles | Self::InvalidType { .. } | Self::TooLarge { .. } | Self::Malformed(_)
        )
    }

    /// The message shown to the uploader for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoFiles => "No files provided".to_string(),
            Self::InvalidType { file, .. } => {
                format!("Invalid file type: {file}. Only images are allowed.")
            }
            Self::TooLarge { file, limit, .. } => {
                format!(
                    "File too large: {file}. Maximum size is {}MB.",
                    limit / (1024 * 1024)
                )
            }
            Self::NotConfigured => {
                "Image upload service not configured. Please contact administrator.".to_string()
            }
            Self::Host(msg) => format!("Upload failed: {msg}"),
            Self::Malformed(_) => "Malformed upload request".to_string(),
        }
    }
}

pub(crate) fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
