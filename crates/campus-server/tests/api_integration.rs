//! Integration tests for the HTTP API
//!
//! These tests exercise the API endpoints using tower::ServiceExt::oneshot()
//! without starting a real server or requiring network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use campus::{
    Actions, AdminCredentials, ImageFile, ImageHost, Store, UploadError, UploadPolicy, ViewCache,
};
use campus_server::{api, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "campus-test-boundary";

/// Image host that hands back predictable URLs and counts calls
#[derive(Default)]
struct FakeHost {
    calls: AtomicUsize,
}

#[async_trait]
impl ImageHost for FakeHost {
    async fn upload(&self, file: &ImageFile, policy: &UploadPolicy) -> Result<String, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://img.test/{}/{}", policy.folder, file.name))
    }
}

/// Create a test AppState with a temp directory
fn test_state(temp_dir: &std::path::Path, host: Option<Arc<FakeHost>>) -> Arc<AppState> {
    let store = Arc::new(Store::open(&temp_dir.join("campus.db")).unwrap());

    Arc::new(AppState {
        actions: Actions::new(store, Arc::new(ViewCache::new())),
        image_host: host.map(|h| h as Arc<dyn ImageHost>),
        upload_policy: UploadPolicy::default(),
        admin: Some(AdminCredentials::plain("admin", "s3cret")),
    })
}

fn test_app(temp_dir: &std::path::Path) -> Router {
    api::router(test_state(temp_dir, None))
}

/// Helper to read a response body as JSON
async fn body_json(resp: Response<Body>) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(resp: &Response<Body>) -> &str {
    resp.headers()[header::LOCATION].to_str().unwrap()
}

/// A JSON request carrying the session cookie
fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, "session=true");
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn event_body(title: &str) -> Value {
    json!({
        "title": title,
        "date": "2025-01-10",
        "description": "Industry speakers on campus",
        "type": "Seminar",
        "academicYear": "2024-2025",
        "year": "All",
        "images": [{ "url": "https://img.test/talk.png" }],
    })
}

fn upload_request(parts: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (file_name, content_type, data) in parts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_admin_requires_session() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    for uri in ["/admin", "/admin/event-types"] {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&resp), "/login");
    }
}

#[tokio::test]
async fn test_login_page_redirects_with_session() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let resp = app
        .clone()
        .oneshot(admin_request("GET", "/login", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin");

    let req = Request::builder().uri("/login").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_sets_cookie() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=admin&password=s3cret"))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin");
    let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("session=true"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let req = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"admin","password":"guess"}"#))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    let json = body_json(resp).await;
    assert_eq!(json["error"], "Invalid username or password.");
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let resp = app
        .oneshot(admin_request("POST", "/logout", None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");
    let cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_event_lifecycle() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    // Create
    let resp = app
        .clone()
        .oneshot(admin_request("POST", "/admin/events", Some(event_body("Tech Talk"))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Event created successfully");
    let id = json["id"].as_str().unwrap().to_string();

    // Public listing, no session needed
    let req = Request::builder().uri("/events").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["events"][0]["title"], "Tech Talk");
    assert_eq!(json["events"][0]["images"][0], "https://img.test/talk.png");

    // Partial update
    let resp = app
        .clone()
        .oneshot(admin_request(
            "PUT",
            &format!("/admin/events/{id}"),
            Some(json!({ "title": "Tech Talk II" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(admin_request("GET", &format!("/admin/events/{id}"), None))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["title"], "Tech Talk II");
    assert_eq!(json["type"], "Seminar");

    // Listing reflects the edit
    let req = Request::builder().uri("/events").body(Body::empty()).unwrap();
    let json = body_json(app.clone().oneshot(req).await.unwrap()).await;
    assert_eq!(json["events"][0]["title"], "Tech Talk II");

    // Delete, then delete again
    let resp = app
        .clone()
        .oneshot(admin_request("DELETE", &format!("/admin/events/{id}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(admin_request("DELETE", &format!("/admin/events/{id}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Event not found");
}

#[tokio::test]
async fn test_invalid_event_rejected() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let mut body = event_body("  ");
    body["images"] = json!([]);
    let resp = app
        .clone()
        .oneshot(admin_request("POST", "/admin/events", Some(body)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    let fields: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"title"));
    assert!(fields.contains(&"images"));

    let json = body_json(app.oneshot(admin_request("GET", "/admin", None)).await.unwrap()).await;
    assert_eq!(json["events"], json!([]));
}

#[tokio::test]
async fn test_mistyped_field_rejected() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let mut body = event_body("Tech Talk");
    body["title"] = json!(5);
    let resp = app
        .clone()
        .oneshot(admin_request("POST", "/admin/events", Some(body)))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["field"], "title");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Validation failed: Invalid title"));

    // Nested paths are reported against their top-level field
    let resp = app
        .clone()
        .oneshot(admin_request(
            "POST",
            "/admin/projects",
            Some(json!({ "students": [7] })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["errors"][0]["field"], "students");

    // Not JSON at all
    let req = Request::builder()
        .method("POST")
        .uri("/admin/event-types")
        .header(header::COOKIE, "session=true")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\":"))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["field"], "body");

    let json = body_json(app.oneshot(admin_request("GET", "/admin", None)).await.unwrap()).await;
    assert_eq!(json["events"], json!([]));
    assert_eq!(json["eventTypes"], json!([]));
}

#[tokio::test]
async fn test_project_bad_ids() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let resp = app
        .clone()
        .oneshot(admin_request("DELETE", "/admin/projects/not-an-id", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Invalid project ID format");

    let missing = uuid_like();
    let resp = app
        .clone()
        .oneshot(admin_request(
            "PUT",
            &format!("/admin/projects/{missing}"),
            Some(json!({ "title": "Renamed" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .oneshot(admin_request("GET", &format!("/admin/projects/{missing}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "Project not found");
}

fn uuid_like() -> String {
    campus::DocId::generate().to_string()
}

#[tokio::test]
async fn test_duplicate_academic_year_conflicts() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let add = || admin_request("POST", "/admin/academic-years", Some(json!({ "year": "2024-2025" })));

    let resp = app.clone().oneshot(add()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app.clone().oneshot(add()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(resp).await["message"],
        "Academic year \"2024-2025\" already exists."
    );

    let resp = app
        .oneshot(admin_request("GET", "/admin/academic-years", None))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["year"], "2024-2025");
}

#[tokio::test]
async fn test_upload_returns_urls_in_order() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let host = Arc::new(FakeHost::default());
    let app = api::router(test_state(temp_dir.path(), Some(host.clone())));

    let resp = app
        .oneshot(upload_request(&[
            ("first.png", "image/png", b"\x89PNG".as_slice()),
            ("second.jpg", "image/jpeg", b"\xff\xd8".as_slice()),
        ]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(
        json["urls"],
        json!([
            "https://img.test/campus-connect/first.png",
            "https://img.test/campus-connect/second.jpg",
        ])
    );
    assert_eq!(host.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_upload_large_batch() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let host = Arc::new(FakeHost::default());
    let app = api::router(test_state(temp_dir.path(), Some(host.clone())));

    // Each file is under the per-file limit; together they pass 64 MB
    let data = vec![0u8; 9 * 1024 * 1024];
    let names: Vec<String> = (0..8).map(|i| format!("photo{i}.png")).collect();
    let parts: Vec<(&str, &str, &[u8])> = names
        .iter()
        .map(|name| (name.as_str(), "image/png", data.as_slice()))
        .collect();

    let resp = app.oneshot(upload_request(&parts)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["urls"].as_array().unwrap().len(), 8);
    assert_eq!(json["urls"][7], "https://img.test/campus-connect/photo7.png");
    assert_eq!(host.calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn test_upload_names_oversized_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let host = Arc::new(FakeHost::default());
    let app = api::router(test_state(temp_dir.path(), Some(host.clone())));

    let huge = vec![0u8; 70 * 1024 * 1024];
    let resp = app
        .clone()
        .oneshot(upload_request(&[
            ("small.png", "image/png", b"\x89PNG".as_slice()),
            ("huge.png", "image/png", huge.as_slice()),
        ]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["error"],
        "File too large: huge.png. Maximum size is 10MB."
    );

    // One byte over the limit
    let over = vec![0u8; 10 * 1024 * 1024 + 1];
    let resp = app
        .oneshot(upload_request(&[("over.png", "image/png", over.as_slice())]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["error"],
        "File too large: over.png. Maximum size is 10MB."
    );
    assert_eq!(host.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let host = Arc::new(FakeHost::default());
    let app = api::router(test_state(temp_dir.path(), Some(host.clone())));

    let resp = app
        .oneshot(upload_request(&[
            ("photo.png", "image/png", b"\x89PNG".as_slice()),
            ("notes.txt", "text/plain", b"hello".as_slice()),
        ]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["error"],
        "Invalid file type: notes.txt. Only images are allowed."
    );
    assert_eq!(host.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_without_files() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let host = Arc::new(FakeHost::default());
    let app = api::router(test_state(temp_dir.path(), Some(host)));

    let resp = app.oneshot(upload_request(&[])).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "No files provided");
}

#[tokio::test]
async fn test_upload_without_host() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let app = test_app(temp_dir.path());

    let resp = app
        .oneshot(upload_request(&[("photo.png", "image/png", b"\x89PNG".as_slice())]))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(resp).await["error"],
        "Image upload service not configured. Please contact administrator."
    );
}
