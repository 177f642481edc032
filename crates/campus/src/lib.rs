//! # Campus - content backend for a college website
//!
//! Campus keeps the events and student projects shown on a college website,
//! together with the taxonomies that classify them, and runs the admin
//! operations that change them.
//!
//! ## Features
//!
//! - **Validated writes**: admin forms are normalized and checked in full
//!   before anything touches the store.
//! - **Document store**: one SQLite file holds every collection as JSON
//!   documents, with unique taxonomy values enforced by an index.
//! - **View cache**: listing pages are rendered once and invalidated by path
//!   after each mutation.
//! - **Image uploads**: batches are checked, then forwarded concurrently to
//!   a Cloudinary-compatible host.
//! - **Session gate**: a single admin login guarded by a cookie.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use campus::forms::{DateInput, EventForm, ImageRef};
//! use campus::{Actions, Store, ViewCache};
//!
//! let store = Arc::new(Store::open_in_memory()?);
//! let actions = Actions::new(store, Arc::new(ViewCache::new()));
//!
//! let result = actions.create_event(EventForm {
//!     title: Some("Tech Talk".into()),
//!     date: Some(DateInput::from("2025-01-10")),
//!     description: Some("Industry speakers on campus".into()),
//!     event_type: Some("Seminar".into()),
//!     academic_year: Some("2024-2025".into()),
//!     audience: Some("All".into()),
//!     images: Some(vec![ImageRef::from("https://img.example/talk.png")]),
//!     links: None,
//! });
//! assert!(result.success);
//!
//! let page = actions.events_page();
//! assert_eq!(page["events"][0]["title"], "Tech Talk");
//! # Ok::<(), campus::StoreError>(())
//! ```
//!
//! ## Module Overview
//!
//! - [`actions`]: Server actions and cached page reads
//! - [`config`]: Configuration for the backend
//! - [`error`]: Error types and Result alias
//! - [`forms`]: Form payload shapes
//! - [`media`]: Upload checks and the image host client
//! - [`models`]: Stored document shapes
//! - [`session`]: Admin login and the session gate
//! - [`store`]: SQLite document store
//! - [`validation`]: Form normalization and required-field checks
//! - [`views`]: Rendered listing cache

#![forbid(unsafe_code)]
#![warn(clippy::all)]

// =============================================================================
// Public modules
// =============================================================================

pub mod actions;
pub mod config;
pub mod error;
pub mod forms;
pub mod media;
pub mod models;
pub mod session;
pub mod store;
pub mod validation;
pub mod views;

// =============================================================================
// Public re-exports
// =============================================================================

pub use actions::{ActionResult, Actions, Taxonomy};
pub use config::{Config, HostCredentials};
pub use error::{Error, FieldError, Result, StoreError, UploadError, ValidationErrors};
pub use media::{CloudinaryHost, ImageFile, ImageHost, UploadPolicy};
pub use models::{
    AcademicYear, CollectionName, DocId, Document, Event, EventType, Link, Project,
    ProjectCategory,
};
pub use session::AdminCredentials;
pub use store::Store;
pub use views::ViewCache;
