//! Rendered listing cache
//!
//! Listing pages are rendered from the store once and then served from
//! memory until an action marks them stale. Invalidation is by exact path.
//!
//! Each path carries a generation counter. A render that started before an
//! invalidation is returned to its caller but never stored, so a slow
//! render cannot overwrite a newer invalidation with stale data.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::models::DocId;

/// Admin dashboard
pub const ADMIN_VIEW: &str = "/admin";
/// Public events listing
pub const EVENTS_VIEW: &str = "/events";
/// Public student projects listing
pub const PROJECTS_VIEW: &str = "/student-corner";

/// Edit page for one event
#[must_use]
pub fn event_edit_view(id: &DocId) -> String {
    format!("/admin/events/{id}/edit")
}

/// Edit page for one project
#[must_use]
pub fn project_edit_view(id: &DocId) -> String {
    format!("/admin/projects/{id}/edit")
}

#[derive(Debug, Clone)]
struct CachedView {
    body: Value,
    rendered_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Entries {
    views: HashMap<String, CachedView>,
    generations: HashMap<String, u64>,
}

impl Entries {
    fn generation(&self, path: &str) -> u64 {
        self.generations.get(path).copied().unwrap_or_default()
    }
}

/// Cache of rendered listing views keyed by path
#[derive(Debug, Default)]
pub struct ViewCache {
    entries: RwLock<Entries>,
}

impl ViewCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached body for `path`, if fresh
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        self.entries.read().views.get(path).map(|v| v.body.clone())
    }

    /// When `path` was last rendered, if it is cached
    #[must_use]
    pub fn rendered_at(&self, path: &str) -> Option<DateTime<Utc>> {
        self.entries.read().views.get(path).map(|v| v.rendered_at)
    }

    /// Whether `path` has a fresh cached body
    #[must_use]
    pub fn is_cached(&self, path: &str) -> bool {
        self.entries.read().views.contains_key(path)
    }

    /// Serve `path` from cache, rendering it on a miss.
    ///
    /// A failed render is returned as-is and nothing is cached.
    pub fn get_or_try_render<E, F>(&self, path: &str, render: F) -> Result<Value, E>
    where
        F: FnOnce() -> Result<Value, E>,
    {
        let started = {
            let entries = self.entries.read();
            if let Some(view) = entries.views.get(path) {
                return Ok(view.body.clone());
            }
            entries.generation(path)
        };

        let body = render()?;

        let mut entries = self.entries.write();
        if entries.generation(path) == started {
            entries.views.insert(
                path.to_string(),
                CachedView {
                    body: body.clone(),
                    rendered_at: Utc::now(),
                },
            );
            debug!(path, "View rendered and cached");
        } else {
            debug!(path, "View invalidated during render, not cached");
        }
        Ok(body)
    }

    /// Mark one path stale
    pub fn invalidate(&self, path: &str) {
        let mut entries = self.entries.write();
        entries.views.remove(path);
        *entries.generations.entry(path.to_string()).or_default() += 1;
        debug!(path, "View invalidated");
    }

    /// Mark several paths stale
    pub fn invalidate_all<I, S>(&self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.invalidate(path.as_ref());
        }
    }
}
