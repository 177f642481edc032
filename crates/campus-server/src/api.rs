//! HTTP API for the public site, the admin area and image uploads

use std::sync::Arc;

use axum::{
    extract::{
        multipart::Field, rejection::JsonRejection, DefaultBodyLimit, FromRequest, Multipart,
        Path, Request, State,
    },
    http::{
        header::{CONTENT_TYPE, SET_COOKIE},
        StatusCode,
    },
    middleware::from_fn,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Form, Json, Router,
};
use campus::{
    forms::{EventForm, ProjectForm},
    media::{is_image_type, upload_images},
    session::{ADMIN_PATH, LOGIN_PATH, SESSION_COOKIE, SESSION_VALUE},
    AcademicYear, ActionResult, CollectionName, Error, Event, EventType, ImageFile, Project,
    ProjectCategory, StoreError, Taxonomy, UploadError, UploadPolicy, ValidationErrors,
};
use cookie::Cookie;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{gate, AppState};

/// Request body ceiling for the upload route. Each file is also held to
/// the upload policy while it streams in.
pub const UPLOAD_BODY_LIMIT: usize = 512 * 1024 * 1024;

/// Create the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(events_page))
        .route("/student-corner", get(student_corner_page))
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        .route("/admin", get(admin_dashboard))
        .route("/admin/events", post(create_event))
        .route(
            "/admin/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/admin/projects", post(create_project))
        .route(
            "/admin/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route(
            "/admin/event-types",
            get(list_taxonomy::<EventType>).post(add_taxonomy::<EventType>),
        )
        .route(
            "/admin/event-types/{id}",
            delete(delete_taxonomy::<EventType>),
        )
        .route(
            "/admin/project-categories",
            get(list_taxonomy::<ProjectCategory>).post(add_taxonomy::<ProjectCategory>),
        )
        .route(
            "/admin/project-categories/{id}",
            delete(delete_taxonomy::<ProjectCategory>),
        )
        .route(
            "/admin/academic-years",
            get(list_taxonomy::<AcademicYear>).post(add_taxonomy::<AcademicYear>),
        )
        .route(
            "/admin/academic-years/{id}",
            delete(delete_taxonomy::<AcademicYear>),
        )
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .layer(from_fn(gate::session_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A library error rendered as `{error}` with a matching status
#[derive(Debug)]
pub struct ApiError(pub Error);

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.user_message(),
            }),
        )
            .into_response()
    }
}

/// HTTP status for a library error
#[must_use]
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Unauthorized => StatusCode::UNAUTHORIZED,
        Error::Store(store) => match store {
            StoreError::InvalidId { .. } | StoreError::Schema { .. } => StatusCode::BAD_REQUEST,
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Conflict { .. } => StatusCode::CONFLICT,
            StoreError::Connection(_) | StoreError::Corrupt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        },
        Error::Upload(upload) if upload.is_rejection() => StatusCode::BAD_REQUEST,
        Error::Upload(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn action_response(result: ActionResult, success: StatusCode) -> Response {
    let status = result.error.as_ref().map_or(success, status_for);
    (status, Json(result)).into_response()
}

/// A JSON payload with a known set of top-level fields
pub trait FormBody: DeserializeOwned {
    /// Field names as submitted
    const FIELDS: &'static [&'static str];
}

impl FormBody for EventForm {
    const FIELDS: &'static [&'static str] = EventForm::FIELDS;
}

impl FormBody for ProjectForm {
    const FIELDS: &'static [&'static str] = ProjectForm::FIELDS;
}

/// JSON extractor whose rejections answer as a failed action.
///
/// A field of the wrong type is reported against that field; any other
/// unreadable body is reported against `body`. Both are 400s.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: FormBody,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                let errors = rejected_fields(T::FIELDS, &rejection);
                warn!(%errors, "Request body rejected");
                Err(action_response(
                    ActionResult::failed(errors.into()),
                    StatusCode::BAD_REQUEST,
                ))
            }
        }
    }
}

fn rejected_fields(fields: &[&'static str], rejection: &JsonRejection) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let JsonRejection::JsonDataError(err) = rejection else {
        errors.push("body", rejection.body_text());
        return errors;
    };

    // `<prefix>: <path>: <reason> at line L column C`
    let text = err.body_text();
    let detail = text
        .split_once("target type: ")
        .map_or(text.as_str(), |(_, rest)| rest);
    let field = detail.split_once(": ").and_then(|(path, reason)| {
        let name = path.split(['.', '[']).next()?;
        let field = fields.iter().copied().find(|f| *f == name)?;
        Some((field, reason.split(" at line ").next().unwrap_or(reason)))
    });
    match field {
        Some((field, reason)) => errors.push(field, format!("Invalid {field}: {reason}")),
        None => errors.push("body", detail),
    }
    errors
}

/// Health check endpoint
async fn health() -> &'static str {
    "ok"
}

// Public pages

async fn events_page(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.actions.events_page())
}

async fn student_corner_page(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.actions.student_corner_page())
}

// Session

/// Login credentials, as a form or JSON body
#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Reached only without a session; the gate redirects logged-in visitors
async fn login_page() -> Json<Value> {
    Json(json!({ "authenticated": false }))
}

async fn login(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let form = match read_login_form(request).await {
        Ok(form) => form,
        Err(rejection) => return rejection,
    };

    let Some(admin) = state.admin.as_ref() else {
        warn!("Login attempted but admin credentials are not configured");
        return ApiError(Error::config("admin credentials not set")).into_response();
    };

    if !admin.verify(&form.username, &form.password) {
        warn!(username = %form.username, "Login failed");
        return ApiError(Error::Unauthorized).into_response();
    }

    info!(username = %form.username, "Admin logged in");
    let cookie = Cookie::build((SESSION_COOKIE, SESSION_VALUE))
        .http_only(true)
        .path("/")
        .build();
    ([(SET_COOKIE, cookie.to_string())], Redirect::to(ADMIN_PATH)).into_response()
}

async fn read_login_form(request: Request) -> Result<LoginForm, Response> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        Json::<LoginForm>::from_request(request, &())
            .await
            .map(|Json(form)| form)
            .map_err(IntoResponse::into_response)
    } else {
        Form::<LoginForm>::from_request(request, &())
            .await
            .map(|Form(form)| form)
            .map_err(IntoResponse::into_response)
    }
}

async fn logout() -> Response {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .path("/")
        .build();
    cookie.make_removal();
    info!("Admin logged out");
    ([(SET_COOKIE, cookie.to_string())], Redirect::to(LOGIN_PATH)).into_response()
}

// Admin

async fn admin_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.actions.admin_dashboard()?))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    ApiJson(form): ApiJson<EventForm>,
) -> Response {
    action_response(state.actions.create_event(form), StatusCode::CREATED)
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    state
        .actions
        .get_event_by_id(&id)
        .map(Json)
        .ok_or_else(|| StoreError::not_found(CollectionName::Events, id).into())
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<EventForm>,
) -> Response {
    action_response(state.actions.update_event(&id, form), StatusCode::OK)
}

async fn delete_event(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    action_response(state.actions.delete_event(&id), StatusCode::OK)
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    ApiJson(form): ApiJson<ProjectForm>,
) -> Response {
    action_response(state.actions.create_project(form), StatusCode::CREATED)
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiError> {
    state
        .actions
        .get_project_by_id(&id)
        .map(Json)
        .ok_or_else(|| StoreError::not_found(CollectionName::Projects, id).into())
}

async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(form): ApiJson<ProjectForm>,
) -> Response {
    action_response(state.actions.update_project(&id, form), StatusCode::OK)
}

async fn delete_project(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    action_response(state.actions.delete_project(&id), StatusCode::OK)
}

/// `{name}` for event types and categories, `{year}` for academic years
#[derive(Debug, Deserialize)]
struct TaxonomyBody {
    #[serde(default, alias = "year")]
    name: String,
}

impl FormBody for TaxonomyBody {
    const FIELDS: &'static [&'static str] = &["name", "year"];
}

async fn list_taxonomy<T: Taxonomy>(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<T>>, ApiError> {
    Ok(Json(state.actions.list_taxonomy::<T>()?))
}

async fn add_taxonomy<T: Taxonomy>(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<TaxonomyBody>,
) -> Response {
    action_response(state.actions.add_taxonomy::<T>(&body.name), StatusCode::CREATED)
}

async fn delete_taxonomy<T: Taxonomy>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    action_response(state.actions.delete_taxonomy::<T>(&id), StatusCode::OK)
}

// Uploads

#[derive(Debug, Serialize)]
struct UploadResponse {
    urls: Vec<String>,
}

/// Accept `files` (or `files[]`) and forward them to the image host
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let Some(host) = state.image_host.as_deref() else {
        return Err(UploadError::NotConfigured.into());
    };

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::malformed(e.body_text()))?
    {
        if !matches!(field.name(), Some("files" | "files[]")) {
            continue;
        }
        files.push(read_image(field, &state.upload_policy).await?);
    }

    let urls = upload_images(host, &state.upload_policy, &files).await?;
    Ok(Json(UploadResponse { urls }))
}

/// Read one file part, giving up as soon as it breaks the policy.
///
/// Files arrive in order, so failing here names the same file a whole
/// batch check would.
async fn read_image(
    mut field: Field<'_>,
    policy: &UploadPolicy,
) -> Result<ImageFile, UploadError> {
    let name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();
    if !is_image_type(&content_type) {
        return Err(UploadError::InvalidType {
            file: name.into(),
            content_type: content_type.into(),
        });
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| UploadError::malformed(e.body_text()))?
    {
        bytes.extend_from_slice(&chunk);
        // Size read so far, not the declared total
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if size > policy.max_bytes {
            return Err(UploadError::TooLarge {
                file: name.into(),
                size,
                limit: policy.max_bytes,
            });
        }
    }
    Ok(ImageFile::new(name, content_type, bytes))
}
