//! Form normalization and required-field checks
//!
//! Turns [`EventForm`] and [`ProjectForm`] payloads into canonical values:
//! variants collapse to scalars, text is trimmed, blank image URLs, student
//! names and links are dropped. Creation requires every mandatory field;
//! an update checks only the fields it carries. All failures for one form
//! are collected into a single [`ValidationErrors`] so nothing is written
//! until the whole form is acceptable.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Utc};
use regex::Regex;

use crate::error::ValidationErrors;
use crate::forms::{DateInput, EventForm, ImageRef, ProjectForm, StudentRef};
use crate::models::{DocId, Event, Link, Project};

/// Oldest academic year a project may claim
pub const MIN_ACADEMIC_YEAR: i32 = 1900;

/// How many years past the current one a project may claim
pub const ACADEMIC_YEAR_HORIZON: i32 = 10;

static FOUR_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]{4}").expect("static pattern is valid"));

/// The current calendar year (UTC)
#[must_use]
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// First run of four ASCII digits in `academic_year`, if any.
#[must_use]
pub fn first_year(academic_year: &str) -> Option<i32> {
    FOUR_DIGITS
        .find(academic_year)
        .and_then(|m| m.as_str().parse().ok())
}

/// Numeric year of an academic year string, falling back to the current year.
///
/// ```rust
/// assert_eq!(campus::validation::extract_year("2026-2027"), 2026);
/// assert_eq!(campus::validation::extract_year("2024-25"), 2024);
/// ```
#[must_use]
pub fn extract_year(academic_year: &str) -> i32 {
    first_year(academic_year).unwrap_or_else(current_year)
}

/// Image URLs with blanks removed
#[must_use]
pub fn normalize_images(images: Vec<ImageRef>) -> Vec<String> {
    images
        .iter()
        .map(|image| image.url().trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Student names with blanks removed
#[must_use]
pub fn normalize_students(students: Vec<StudentRef>) -> Vec<String> {
    students
        .iter()
        .map(|student| student.name().trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Links with trimmed text; links without a URL are dropped
#[must_use]
pub fn normalize_links(links: Vec<Link>) -> Vec<Link> {
    links
        .into_iter()
        .filter_map(|link| {
            let url = link.url.trim();
            (!url.is_empty()).then(|| Link::new(link.title.trim(), url))
        })
        .collect()
}

/// A validated event ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub date: String,
    pub description: String,
    pub event_type: String,
    pub academic_year: String,
    pub audience: String,
    pub images: Vec<String>,
    pub links: Vec<Link>,
}

impl NewEvent {
    /// Build the stored document
    #[must_use]
    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        Event {
            id: DocId::generate(),
            title: self.title,
            date: self.date,
            description: self.description,
            event_type: self.event_type,
            academic_year: self.academic_year,
            audience: self.audience,
            images: self.images,
            links: self.links,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validate a new event submission.
pub fn validate_new_event(form: EventForm) -> Result<NewEvent, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = required(&mut errors, "title", "Title", form.title);
    let date = required_date(&mut errors, form.date);
    let description = required(&mut errors, "description", "Description", form.description);
    let event_type = required(&mut errors, "type", "Event type", form.event_type);
    let academic_year = required(&mut errors, "academicYear", "Academic Year", form.academic_year);
    let audience = required(&mut errors, "year", "Audience", form.audience);
    let images = required_images(&mut errors, form.images.unwrap_or_default(), "event");
    let links = normalize_links(form.links.unwrap_or_default());

    errors.into_result(()).map(|()| NewEvent {
        title: title.unwrap_or_default(),
        date: date.unwrap_or_default(),
        description: description.unwrap_or_default(),
        event_type: event_type.unwrap_or_default(),
        academic_year: academic_year.unwrap_or_default(),
        audience: audience.unwrap_or_default(),
        images,
        links,
    })
}

/// The supplied subset of an event edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub academic_year: Option<String>,
    pub audience: Option<String>,
    pub images: Option<Vec<String>>,
    pub links: Option<Vec<Link>>,
}

impl EventChanges {
    /// Apply the changes to a stored event
    pub fn apply(self, event: &mut Event, now: DateTime<Utc>) {
        replace(&mut event.title, self.title);
        replace(&mut event.date, self.date);
        replace(&mut event.description, self.description);
        replace(&mut event.event_type, self.event_type);
        replace(&mut event.academic_year, self.academic_year);
        replace(&mut event.audience, self.audience);
        replace(&mut event.images, self.images);
        replace(&mut event.links, self.links);
        event.updated_at = now;
    }
}

/// Validate an event edit. Absent fields stay untouched.
pub fn validate_event_changes(form: EventForm) -> Result<EventChanges, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let changes = EventChanges {
        title: supplied(&mut errors, "title", "Title", form.title),
        date: form.date.map(|date| supplied_date(&mut errors, date)),
        description: supplied(&mut errors, "description", "Description", form.description),
        event_type: supplied(&mut errors, "type", "Event type", form.event_type),
        academic_year: supplied(&mut errors, "academicYear", "Academic Year", form.academic_year),
        audience: supplied(&mut errors, "year", "Audience", form.audience),
        images: form
            .images
            .map(|images| required_images(&mut errors, images, "event")),
        links: form.links.map(normalize_links),
    };

    errors.into_result(changes)
}

/// A validated project ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    pub students: Vec<String>,
    pub description: String,
    pub images: Vec<String>,
    pub category: String,
    pub class: String,
    pub year: i32,
    pub academic_year: String,
    pub live_link: Option<String>,
    pub other_links: Vec<Link>,
    pub date: String,
}

impl NewProject {
    /// Build the stored document
    #[must_use]
    pub fn into_project(self, now: DateTime<Utc>) -> Project {
        Project {
            id: DocId::generate(),
            title: self.title,
            students: self.students,
            description: self.description,
            images: self.images,
            category: self.category,
            class: self.class,
            year: self.year,
            academic_year: self.academic_year,
            live_link: self.live_link,
            other_links: self.other_links,
            date: self.date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validate a new project submission.
pub fn validate_new_project(form: ProjectForm) -> Result<NewProject, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = required(&mut errors, "title", "Title", form.title);
    let description = required(&mut errors, "description", "Description", form.description);
    let academic_year = required(&mut errors, "academicYear", "Academic Year", form.academic_year);
    if let Some(academic_year) = &academic_year {
        check_academic_year(&mut errors, academic_year);
    }
    let students = required_students(&mut errors, form.students.unwrap_or_default());
    let category = required(&mut errors, "category", "Category", form.category);
    let class = required(&mut errors, "class", "Class", form.class);
    let date = required_date(&mut errors, form.date);
    let images = required_images(&mut errors, form.images.unwrap_or_default(), "project");

    errors.into_result(()).map(|()| {
        let academic_year = academic_year.unwrap_or_default();
        NewProject {
            title: title.unwrap_or_default(),
            students,
            description: description.unwrap_or_default(),
            images,
            category: category.unwrap_or_default(),
            class: class.unwrap_or_default(),
            year: extract_year(&academic_year),
            academic_year,
            live_link: optional(form.live_link),
            other_links: normalize_links(form.other_links.unwrap_or_default()),
            date: date.unwrap_or_default(),
        }
    })
}

/// The supplied subset of a project edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub students: Option<Vec<String>>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    pub class: Option<String>,
    pub academic_year: Option<String>,
    /// `Some(None)` clears the live link
    pub live_link: Option<Option<String>>,
    pub other_links: Option<Vec<Link>>,
    pub date: Option<String>,
}

impl ProjectChanges {
    /// Apply the changes to a stored project. A new academic year also
    /// re-derives the numeric `year`.
    pub fn apply(self, project: &mut Project, now: DateTime<Utc>) {
        if let Some(academic_year) = self.academic_year {
            project.year = extract_year(&academic_year);
            project.academic_year = academic_year;
        }
        replace(&mut project.title, self.title);
        replace(&mut project.students, self.students);
        replace(&mut project.description, self.description);
        replace(&mut project.images, self.images);
        replace(&mut project.category, self.category);
        replace(&mut project.class, self.class);
        replace(&mut project.live_link, self.live_link);
        replace(&mut project.other_links, self.other_links);
        replace(&mut project.date, self.date);
        project.updated_at = now;
    }
}

/// Validate a project edit. Absent fields stay untouched.
pub fn validate_project_changes(form: ProjectForm) -> Result<ProjectChanges, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let academic_year = supplied(&mut errors, "academicYear", "Academic Year", form.academic_year);
    if let Some(academic_year) = academic_year.as_deref().filter(|y| !y.is_empty()) {
        check_academic_year(&mut errors, academic_year);
    }

    let changes = ProjectChanges {
        title: supplied(&mut errors, "title", "Title", form.title),
        students: form
            .students
            .map(|students| required_students(&mut errors, students)),
        description: supplied(&mut errors, "description", "Description", form.description),
        images: form
            .images
            .map(|images| required_images(&mut errors, images, "project")),
        category: supplied(&mut errors, "category", "Category", form.category),
        class: supplied(&mut errors, "class", "Class", form.class),
        academic_year,
        live_link: form.live_link.map(|link| optional(Some(link))),
        other_links: form.other_links.map(normalize_links),
        date: form.date.map(|date| supplied_date(&mut errors, date)),
    };

    errors.into_result(changes)
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn required(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: Option<String>,
) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => {
            errors.push(field, format!("{label} is required"));
            None
        }
    }
}

fn supplied(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: Option<String>,
) -> Option<String> {
    let text = value?.trim().to_string();
    if text.is_empty() {
        errors.push(field, format!("{label} cannot be empty"));
    }
    Some(text)
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn required_date(errors: &mut ValidationErrors, date: Option<DateInput>) -> Option<String> {
    match date.as_ref().and_then(DateInput::to_iso) {
        Some(text) if !text.is_empty() => Some(text),
        _ => {
            errors.push("date", "Date is required");
            None
        }
    }
}

fn supplied_date(errors: &mut ValidationErrors, date: DateInput) -> String {
    let text = date.to_iso().unwrap_or_default();
    if text.is_empty() {
        errors.push("date", "Date cannot be empty");
    }
    text
}

fn required_images(errors: &mut ValidationErrors, images: Vec<ImageRef>, noun: &str) -> Vec<String> {
    let urls = normalize_images(images);
    if urls.is_empty() {
        errors.push("images", format!("At least one image is required for the {noun}."));
    }
    urls
}

fn required_students(errors: &mut ValidationErrors, students: Vec<StudentRef>) -> Vec<String> {
    let names = normalize_students(students);
    if names.is_empty() {
        errors.push("students", "At least one student is required");
    }
    names
}

fn check_academic_year(errors: &mut ValidationErrors, academic_year: &str) {
    let latest = current_year() + ACADEMIC_YEAR_HORIZON;
    match first_year(academic_year) {
        None => errors.push(
            "academicYear",
            "Academic Year must contain a valid year (e.g., 2024-2025)",
        ),
        Some(year) if !(MIN_ACADEMIC_YEAR..=latest).contains(&year) => errors.push(
            "academicYear",
            format!("Academic Year must be between {MIN_ACADEMIC_YEAR} and {latest}"),
        ),
        Some(_) => {}
    }
}
