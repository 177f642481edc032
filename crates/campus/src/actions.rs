//! Server actions
//!
//! Every mutating operation validates its form, writes to the [`Store`],
//! marks the affected views stale and reports an [`ActionResult`]. Actions
//! never return `Err` for expected failures; the failure is carried in the
//! result so handlers can show the message as-is.
//!
//! Reads come in two flavours. Admin reads return [`Result`] so the
//! dashboard can report a broken store. Public page reads degrade to empty
//! listings instead.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{capitalize, Error, FieldError, Result, StoreError, ValidationErrors};
use crate::forms::{EventForm, ProjectForm};
use crate::models::{
    AcademicYear, DocId, Document, Event, EventType, Project, ProjectCategory,
    ACADEMIC_YEAR_PATTERN,
};
use crate::store::Store;
use crate::validation::{
    validate_event_changes, validate_new_event, validate_new_project, validate_project_changes,
};
use crate::views::{
    event_edit_view, project_edit_view, ViewCache, ADMIN_VIEW, EVENTS_VIEW, PROJECTS_VIEW,
};

/// Outcome of a server action
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    /// Id of the created or changed document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocId>,
    /// Rejected form fields, for validation failures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
    /// The underlying failure, kept for status mapping
    #[serde(skip)]
    pub error: Option<Error>,
}

impl ActionResult {
    /// A successful action
    pub fn ok(message: impl Into<String>, id: DocId) -> Self {
        Self {
            success: true,
            message: message.into(),
            id: Some(id),
            errors: Vec::new(),
            error: None,
        }
    }

    /// A failed action, worded for the user
    #[must_use]
    pub fn failed(error: Error) -> Self {
        Self {
            success: false,
            message: error.user_message(),
            id: None,
            errors: error.field_errors().to_vec(),
            error: Some(error),
        }
    }
}

/// A taxonomy collection: a unique string value plus an id
pub trait Taxonomy: Document {
    /// Form field carrying the value
    const FIELD: &'static str;

    /// Views that display this taxonomy
    const VIEWS: &'static [&'static str];

    /// New document with a fresh id
    fn create(value: String) -> Self;

    /// The unique value
    fn value(&self) -> &str;

    /// Format problem with a trimmed, non-blank value
    fn format_error(_value: &str) -> Option<String> {
        None
    }
}

impl Taxonomy for EventType {
    const FIELD: &'static str = "name";
    const VIEWS: &'static [&'static str] = &[ADMIN_VIEW, EVENTS_VIEW];

    fn create(value: String) -> Self {
        Self::new(value)
    }

    fn value(&self) -> &str {
        &self.name
    }
}

impl Taxonomy for ProjectCategory {
    const FIELD: &'static str = "name";
    const VIEWS: &'static [&'static str] = &[ADMIN_VIEW, PROJECTS_VIEW];

    fn create(value: String) -> Self {
        Self::new(value)
    }

    fn value(&self) -> &str {
        &self.name
    }
}

impl Taxonomy for AcademicYear {
    const FIELD: &'static str = "year";
    const VIEWS: &'static [&'static str] = &[ADMIN_VIEW, EVENTS_VIEW, PROJECTS_VIEW];

    fn create(value: String) -> Self {
        Self::new(value)
    }

    fn value(&self) -> &str {
        &self.year
    }

    fn format_error(value: &str) -> Option<String> {
        (!ACADEMIC_YEAR_PATTERN.is_match(value))
            .then(|| "Academic year must be in YYYY-YYYY format".to_string())
    }
}

/// The action layer: a store plus the view cache it keeps fresh
#[derive(Clone)]
pub struct Actions {
    store: Arc<Store>,
    views: Arc<ViewCache>,
}

impl Actions {
    pub fn new(store: Arc<Store>, views: Arc<ViewCache>) -> Self {
        Self { store, views }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn views(&self) -> &ViewCache {
        &self.views
    }

    // Events

    /// Validate and store a new event
    pub fn create_event(&self, form: EventForm) -> ActionResult {
        let result = validate_new_event(form)
            .map_err(Error::from)
            .and_then(|new| {
                let event = new.into_event(Utc::now());
                self.store.collection::<Event>().insert(&event)?;
                Ok(event.id)
            });

        self.finish(result, "Event created successfully", |_| {
            vec![ADMIN_VIEW.to_string(), EVENTS_VIEW.to_string()]
        })
    }

    /// Apply the supplied fields to an event
    pub fn update_event(&self, id: &str, form: EventForm) -> ActionResult {
        let result = validate_event_changes(form)
            .map_err(Error::from)
            .and_then(|changes| {
                self.modify::<Event>(id, |event| changes.apply(event, Utc::now()))
            });

        self.finish(result, "Event updated successfully", |id| {
            vec![ADMIN_VIEW.to_string(), EVENTS_VIEW.to_string(), event_edit_view(id)]
        })
    }

    /// Delete an event. A missing or malformed id is reported, not raised.
    pub fn delete_event(&self, id: &str) -> ActionResult {
        let result = self.remove::<Event>(id);
        self.finish(result, "Event deleted successfully", |id| {
            vec![ADMIN_VIEW.to_string(), EVENTS_VIEW.to_string(), event_edit_view(id)]
        })
    }

    /// Malformed ids, missing events and store failures all read as `None`
    #[must_use]
    pub fn get_event_by_id(&self, id: &str) -> Option<Event> {
        self.find(id)
    }

    /// All events, newest first
    pub fn list_events(&self) -> Result<Vec<Event>> {
        let mut events = self.store.collection::<Event>().list()?;
        events.reverse();
        events.sort_by_key(|e| Reverse(e.created_at));
        Ok(events)
    }

    // Projects

    /// Validate and store a new project, deriving its numeric year
    pub fn create_project(&self, form: ProjectForm) -> ActionResult {
        let result = validate_new_project(form)
            .map_err(Error::from)
            .and_then(|new| {
                let project = new.into_project(Utc::now());
                self.store.collection::<Project>().insert(&project)?;
                Ok(project.id)
            });

        self.finish(result, "Project created successfully", |_| {
            vec![ADMIN_VIEW.to_string(), PROJECTS_VIEW.to_string()]
        })
    }

    /// Apply the supplied fields to a project
    pub fn update_project(&self, id: &str, form: ProjectForm) -> ActionResult {
        let result = validate_project_changes(form)
            .map_err(Error::from)
            .and_then(|changes| {
                self.modify::<Project>(id, |project| changes.apply(project, Utc::now()))
            });

        self.finish(result, "Project updated successfully", |id| {
            vec![ADMIN_VIEW.to_string(), PROJECTS_VIEW.to_string(), project_edit_view(id)]
        })
    }

    pub fn delete_project(&self, id: &str) -> ActionResult {
        let result = self.remove::<Project>(id);
        self.finish(result, "Project deleted successfully", |id| {
            vec![ADMIN_VIEW.to_string(), PROJECTS_VIEW.to_string(), project_edit_view(id)]
        })
    }

    #[must_use]
    pub fn get_project_by_id(&self, id: &str) -> Option<Project> {
        self.find(id)
    }

    /// All projects, newest first
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = self.store.collection::<Project>().list()?;
        projects.reverse();
        projects.sort_by_key(|p| Reverse(p.created_at));
        Ok(projects)
    }

    // Taxonomy

    /// Add a taxonomy value. Duplicates fail with "already exists".
    pub fn add_taxonomy<T: Taxonomy>(&self, value: &str) -> ActionResult {
        let result = check_taxonomy_value::<T>(value).and_then(|value| {
            let doc = T::create(value);
            self.store.collection::<T>().insert(&doc)?;
            Ok(doc.id())
        });

        let message = format!("{} added successfully", capitalize(T::COLLECTION.label()));
        self.finish(result, message, |_| T::VIEWS.iter().map(ToString::to_string).collect())
    }

    /// All values, sorted
    pub fn list_taxonomy<T: Taxonomy>(&self) -> Result<Vec<T>> {
        let mut docs = self.store.collection::<T>().list()?;
        docs.sort_by(|a, b| a.value().cmp(b.value()));
        Ok(docs)
    }

    pub fn delete_taxonomy<T: Taxonomy>(&self, id: &str) -> ActionResult {
        let result = self.remove::<T>(id);
        let message = format!("{} deleted successfully", capitalize(T::COLLECTION.label()));
        self.finish(result, message, |_| T::VIEWS.iter().map(ToString::to_string).collect())
    }

    // Pages

    /// Admin dashboard: every collection, served from the view cache
    pub fn admin_dashboard(&self) -> Result<Value> {
        self.views.get_or_try_render(ADMIN_VIEW, || -> Result<Value> {
            Ok(json!({
                "events": self.list_events()?,
                "projects": self.list_projects()?,
                "eventTypes": self.list_taxonomy::<EventType>()?,
                "projectCategories": self.list_taxonomy::<ProjectCategory>()?,
                "academicYears": self.list_taxonomy::<AcademicYear>()?,
            }))
        })
    }

    /// Public events page. Empty listings if the store can't be read.
    #[must_use]
    pub fn events_page(&self) -> Value {
        let page = self.views.get_or_try_render(EVENTS_VIEW, || -> Result<Value> {
            let mut events = self.store.collection::<Event>().list()?;
            events.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
            Ok(json!({
                "events": events,
                "eventTypes": self.list_taxonomy::<EventType>()?,
                "academicYears": self.list_taxonomy::<AcademicYear>()?,
            }))
        });

        page.unwrap_or_else(|e| {
            warn!(error = %e, "Events page unavailable, serving empty listing");
            json!({ "events": [], "eventTypes": [], "academicYears": [] })
        })
    }

    /// Public student corner page. Empty listings if the store can't be read.
    #[must_use]
    pub fn student_corner_page(&self) -> Value {
        let page = self.views.get_or_try_render(PROJECTS_VIEW, || -> Result<Value> {
            let mut projects = self.store.collection::<Project>().list()?;
            projects.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
            Ok(json!({
                "projects": projects,
                "projectCategories": self.list_taxonomy::<ProjectCategory>()?,
                "academicYears": self.list_taxonomy::<AcademicYear>()?,
            }))
        });

        page.unwrap_or_else(|e| {
            warn!(error = %e, "Student corner unavailable, serving empty listing");
            json!({ "projects": [], "projectCategories": [], "academicYears": [] })
        })
    }

    fn find<T: Document>(&self, id: &str) -> Option<T> {
        self.store
            .collection::<T>()
            .get(id)
            .unwrap_or_else(|e| {
                warn!(collection = %T::COLLECTION, id = %id, error = %e, "Lookup failed");
                None
            })
    }

    fn modify<T: Document>(&self, id: &str, apply: impl FnOnce(&mut T)) -> Result<DocId> {
        let parsed = DocId::parse(id).ok_or_else(|| StoreError::invalid_id(T::COLLECTION, id))?;
        let collection = self.store.collection::<T>();
        let mut doc = collection
            .get(id)?
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, id))?;
        apply(&mut doc);
        collection.replace(&doc)?;
        Ok(parsed)
    }

    fn remove<T: Document>(&self, id: &str) -> Result<DocId> {
        let parsed = DocId::parse(id).ok_or_else(|| StoreError::invalid_id(T::COLLECTION, id))?;
        if self.store.collection::<T>().delete(id)? {
            Ok(parsed)
        } else {
            Err(StoreError::not_found(T::COLLECTION, id).into())
        }
    }

    /// Invalidate on success and wrap the outcome
    fn finish(
        &self,
        result: Result<DocId>,
        message: impl Into<String>,
        stale: impl FnOnce(&DocId) -> Vec<String>,
    ) -> ActionResult {
        match result {
            Ok(id) => {
                let message = message.into();
                self.views.invalidate_all(stale(&id));
                info!(id = %id, "{message}");
                ActionResult::ok(message, id)
            }
            Err(e) => {
                warn!(error = %e, "Action failed");
                ActionResult::failed(e)
            }
        }
    }
}

fn check_taxonomy_value<T: Taxonomy>(value: &str) -> Result<String> {
    let value = value.trim();
    let mut errors = ValidationErrors::new();
    if value.is_empty() {
        errors.push(T::FIELD, format!("{} is required", capitalize(T::FIELD)));
    } else if let Some(message) = T::format_error(value) {
        errors.push(T::FIELD, message);
    }
    errors.into_result(value.to_string()).map_err(Error::from)
}
