//! Document shapes for the five collections
//!
//! Every entity implements [`Document`], which tells the store which
//! collection it lives in, which value (if any) must be unique, and which
//! schema rules it must satisfy before it is written.
//!
//! Documents serialize with camelCase keys. The event taxonomy field is
//! stored as `type` and the event audience tag as `year`, matching what the
//! admin forms submit.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Academic years are stored as `YYYY-YYYY`
pub(crate) static ACADEMIC_YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{4}$").expect("static pattern is valid"));

/// The five document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionName {
    /// Event taxonomy (`Workshop`, `Seminar`, ...)
    EventTypes,
    /// Project taxonomy (`Engineering`, `Arts`, ...)
    ProjectCategories,
    /// Academic years (`2024-2025`, ...)
    AcademicYears,
    /// Campus events
    Events,
    /// Student projects
    Projects,
}

impl CollectionName {
    /// All collections, taxonomy first
    pub const ALL: [Self; 5] = [
        Self::EventTypes,
        Self::ProjectCategories,
        Self::AcademicYears,
        Self::Events,
        Self::Projects,
    ];

    /// Name used as the storage key
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EventTypes => "event_types",
            Self::ProjectCategories => "project_categories",
            Self::AcademicYears => "academic_years",
            Self::Events => "events",
            Self::Projects => "projects",
        }
    }

    /// Singular lowercase noun for messages
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EventTypes => "event type",
            Self::ProjectCategories => "project category",
            Self::AcademicYears => "academic year",
            Self::Events => "event",
            Self::Projects => "project",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(Uuid);

impl DocId {
    /// Generate a fresh random id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id from request text. Malformed input yields `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        s.trim().parse().ok()
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for DocId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A document that can be stored in one of the collections
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the document lives in
    const COLLECTION: CollectionName;

    /// The document's id
    fn id(&self) -> DocId;

    /// Value that must be unique within the collection, if any
    fn unique_key(&self) -> Option<&str> {
        None
    }

    /// Schema rules this document breaks; empty when it may be written
    fn schema_violations(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A titled hyperlink attached to an event or project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Display text
    #[serde(default)]
    pub title: String,
    /// Target URL
    pub url: String,
}

impl Link {
    /// Create a link
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A kind of campus event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventType {
    /// Document id
    pub id: DocId,
    /// Unique type name
    pub name: String,
}

impl EventType {
    /// Create a new event type with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DocId::generate(),
            name: name.into(),
        }
    }
}

impl Document for EventType {
    const COLLECTION: CollectionName = CollectionName::EventTypes;

    fn id(&self) -> DocId {
        self.id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn schema_violations(&self) -> Vec<String> {
        required("name", &self.name).into_iter().collect()
    }
}

/// A category of student project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCategory {
    /// Document id
    pub id: DocId,
    /// Unique category name
    pub name: String,
}

impl ProjectCategory {
    /// Create a new category with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DocId::generate(),
            name: name.into(),
        }
    }
}

impl Document for ProjectCategory {
    const COLLECTION: CollectionName = CollectionName::ProjectCategories;

    fn id(&self) -> DocId {
        self.id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn schema_violations(&self) -> Vec<String> {
        required("name", &self.name).into_iter().collect()
    }
}

/// An academic year such as `2024-2025`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    /// Document id
    pub id: DocId,
    /// Unique `YYYY-YYYY` value
    pub year: String,
}

impl AcademicYear {
    /// Create a new academic year with a fresh id
    pub fn new(year: impl Into<String>) -> Self {
        Self {
            id: DocId::generate(),
            year: year.into(),
        }
    }
}

impl Document for AcademicYear {
    const COLLECTION: CollectionName = CollectionName::AcademicYears;

    fn id(&self) -> DocId {
        self.id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.year)
    }

    fn schema_violations(&self) -> Vec<String> {
        if ACADEMIC_YEAR_PATTERN.is_match(&self.year) {
            Vec::new()
        } else {
            vec![format!("year `{}` must match YYYY-YYYY", self.year)]
        }
    }
}

/// A campus event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Document id
    pub id: DocId,
    /// Event title
    pub title: String,
    /// ISO-8601 date or date-time
    pub date: String,
    /// Body text
    pub description: String,
    /// Free-text reference to an [`EventType`] name
    #[serde(rename = "type")]
    pub event_type: String,
    /// Free-text reference to an [`AcademicYear`]
    pub academic_year: String,
    /// Audience tag (`All`, `Freshman`, `T.Y.BCA(Sci.)`, ...)
    #[serde(rename = "year")]
    pub audience: String,
    /// Image URLs, at least one
    pub images: Vec<String>,
    /// Extra titled links
    #[serde(default)]
    pub links: Vec<Link>,
    /// Set once on insert
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write
    pub updated_at: DateTime<Utc>,
}

impl Document for Event {
    const COLLECTION: CollectionName = CollectionName::Events;

    fn id(&self) -> DocId {
        self.id
    }

    fn schema_violations(&self) -> Vec<String> {
        [
            required("title", &self.title),
            required("date", &self.date),
            required("description", &self.description),
            required("type", &self.event_type),
            required("academicYear", &self.academic_year),
            required("year", &self.audience),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// A student project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Document id
    pub id: DocId,
    /// Project title
    pub title: String,
    /// Team member names, at least one
    pub students: Vec<String>,
    /// Body text
    pub description: String,
    /// Image URLs, at least one
    pub images: Vec<String>,
    /// Free-text reference to a [`ProjectCategory`] name
    pub category: String,
    /// Class or cohort that built the project
    pub class: String,
    /// First year of `academic_year`, derived on write
    pub year: i32,
    /// Free-text reference to an [`AcademicYear`]
    pub academic_year: String,
    /// Deployed project URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_link: Option<String>,
    /// Extra titled links
    #[serde(default)]
    pub other_links: Vec<Link>,
    /// ISO-8601 project date
    pub date: String,
    /// Set once on insert
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write
    pub updated_at: DateTime<Utc>,
}

impl Document for Project {
    const COLLECTION: CollectionName = CollectionName::Projects;

    fn id(&self) -> DocId {
        self.id
    }

    fn schema_violations(&self) -> Vec<String> {
        let mut violations: Vec<String> = [
            required("title", &self.title),
            required("description", &self.description),
            required("category", &self.category),
            required("class", &self.class),
            required("academicYear", &self.academic_year),
            required("date", &self.date),
        ]
        .into_iter()
        .flatten()
        .collect();

        if self.students.iter().any(|s| s.trim().is_empty()) {
            violations.push("students must not contain blank names".to_string());
        }
        if self.images.iter().any(|s| s.trim().is_empty()) {
            violations.push("images must not contain blank URLs".to_string());
        }
        violations
    }
}

fn required(field: &str, value: &str) -> Option<String> {
    value
        .trim()
        .is_empty()
        .then(|| format!("`{field}` is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_parse() {
        let id = DocId::generate();
        assert_eq!(DocId::parse(&id.to_string()), Some(id));
        assert_eq!(DocId::parse("not-an-id"), None);
        assert_eq!(DocId::parse(""), None);
    }

    #[test]
    fn test_academic_year_pattern() {
        assert!(AcademicYear::new("2024-2025").schema_violations().is_empty());
        assert_eq!(AcademicYear::new("2024-25").schema_violations().len(), 1);
        assert_eq!(AcademicYear::new("２０２４-2025").schema_violations().len(), 1);
    }

    #[test]
    fn test_taxonomy_unique_keys() {
        assert_eq!(EventType::new("Workshop").unique_key(), Some("Workshop"));
        assert_eq!(ProjectCategory::new("Arts").unique_key(), Some("Arts"));
        assert_eq!(AcademicYear::new("2023-2024").unique_key(), Some("2023-2024"));
        assert_eq!(EventType::new("  ").schema_violations().len(), 1);
    }

    #[test]
    fn test_event_serializes_form_names() {
        let now = Utc::now();
        let event = Event {
            id: DocId::generate(),
            title: "Hackathon".into(),
            date: "2025-02-14".into(),
            description: "24 hours of code".into(),
            event_type: "Workshop".into(),
            academic_year: "2024-2025".into(),
            audience: "All".into(),
            images: vec!["https://img.example/a.png".into()],
            links: vec![Link::new("Register", "https://forms.example/x")],
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Workshop");
        assert_eq!(json["academicYear"], "2024-2025");
        assert_eq!(json["year"], "All");
        assert!(json.get("createdAt").is_some());
        assert!(event.schema_violations().is_empty());
    }
}
