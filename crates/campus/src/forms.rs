//! Admin form payloads
//!
//! Forms arrive with loosely shaped fields: images as plain URLs or as
//! upload results, students as names or `{name}` entries, dates as text or
//! epoch milliseconds. Each shape is a variant here, so serde decides it
//! once at the boundary and the validation layer only maps variants to
//! scalars.
//!
//! Every field is optional. Creation checks that the required ones are
//! present; an update applies only the fields that were sent.

use chrono::{SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Link;

/// An image reference from a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    /// A URL typed or pasted by the admin
    Url(String),
    /// The result of a prior upload
    Uploaded {
        /// Public URL returned by the image host
        url: String,
    },
}

impl ImageRef {
    /// The referenced URL
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) | Self::Uploaded { url } => url,
        }
    }
}

impl From<&str> for ImageRef {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

/// A project member from a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudentRef {
    /// Plain name
    Name(String),
    /// A row from the dynamic student list
    Entry {
        /// Student name
        name: String,
    },
}

impl StudentRef {
    /// The student's name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Entry { name } => name,
        }
    }
}

impl From<&str> for StudentRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// A date from a form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    /// ISO-8601 text, kept as submitted (trimmed)
    Text(String),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
}

impl DateInput {
    /// Canonical stored text. Timestamps render as UTC with millisecond
    /// precision (`2025-02-14T09:30:00.000Z`); out-of-range timestamps
    /// yield `None`.
    #[must_use]
    pub fn to_iso(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.trim().to_string()),
            Self::Timestamp(millis) => Utc
                .timestamp_millis_opt(*millis)
                .single()
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Event create/edit form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventForm {
    /// Event title
    pub title: Option<String>,
    /// When the event takes place
    pub date: Option<DateInput>,
    /// Body text
    pub description: Option<String>,
    /// Event type name, submitted as `type`
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// `YYYY-YYYY` academic year
    pub academic_year: Option<String>,
    /// Audience tag, submitted as `year`
    #[serde(rename = "year")]
    pub audience: Option<String>,
    /// At least one image on create
    pub images: Option<Vec<ImageRef>>,
    /// Extra titled links
    pub links: Option<Vec<Link>>,
}

impl EventForm {
    /// Field names as submitted
    pub const FIELDS: &'static [&'static str] = &[
        "title",
        "date",
        "description",
        "type",
        "academicYear",
        "year",
        "images",
        "links",
    ];
}

/// Project create/edit form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectForm {
    /// Project title
    pub title: Option<String>,
    /// Team members, at least one on create
    pub students: Option<Vec<StudentRef>>,
    /// Body text
    pub description: Option<String>,
    /// At least one image on create
    pub images: Option<Vec<ImageRef>>,
    /// Project category name
    pub category: Option<String>,
    /// Class label, e.g. `S.Y.BCA`
    pub class: Option<String>,
    /// `YYYY-YYYY` academic year; the project year is derived from it
    pub academic_year: Option<String>,
    /// Deployed project URL. Blank clears it on update.
    pub live_link: Option<String>,
    /// Extra titled links
    pub other_links: Option<Vec<Link>>,
    /// Project date
    pub date: Option<DateInput>,
}

impl ProjectForm {
    /// Field names as submitted
    pub const FIELDS: &'static [&'static str] = &[
        "title",
        "students",
        "description",
        "images",
        "category",
        "class",
        "academicYear",
        "liveLink",
        "otherLinks",
        "date",
    ];
}
