//! Common test utilities for integration tests.
//!
//! Each test gets its own temporary data directory and a router wired to a
//! recording notifier, so tests never share state.

// Not every integration test uses every helper.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use consult_desk_api::{
    app::{create_app, AppState},
    config::Config,
};
use domain::services::{MockNotificationService, SubmissionNotification};
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const ADMIN_TOKEN: &str = "test-admin-token";
pub const ADMIN_USER: &str = "owner";
pub const ADMIN_PASS: &str = "correct-horse";
pub const SERVICE_KEY: &str = "test-service-key";

/// A router plus the handles tests need to inspect its effects.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub notifier: MockNotificationService,
    /// Keeps the data directory alive for the duration of the test.
    pub dir: TempDir,
}

impl TestApp {
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a local store file such as `bookings.json`.
    pub fn store_file(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    /// Rows currently in a local store file.
    pub async fn local_rows(&self, name: &str) -> Vec<Value> {
        let raw = tokio::fs::read_to_string(self.store_file(name))
            .await
            .expect("Failed to read store file");
        serde_json::from_str(&raw).expect("Store file is not a JSON array")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Test configuration: local-only, token and Basic admin auth enabled.
pub fn test_config(data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = data_dir.to_string_lossy().into_owned();
    config.admin.api_key = ADMIN_TOKEN.to_string();
    config.admin.username = ADMIN_USER.to_string();
    config.admin.password = ADMIN_PASS.to_string();
    config.logging.level = "debug".to_string();
    config.logging.format = "pretty".to_string();
    config
}

/// Test configuration pointing the upstream at a mock server.
pub fn test_config_with_upstream(data_dir: &Path, upstream_url: &str) -> Config {
    let mut config = test_config(data_dir);
    config.upstream.url = upstream_url.to_string();
    config.upstream.service_key = SERVICE_KEY.to_string();
    config.upstream.timeout_secs = 1;
    config
}

/// Builds an app in a fresh temporary directory.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config).await
}

/// Builds an app, letting the caller adjust the configuration.
pub async fn spawn_app_with(configure: impl FnOnce(&Path) -> Config) -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = configure(dir.path());
    let notifier = MockNotificationService::new();

    let state = AppState::new(config)
        .await
        .expect("Failed to build app state")
        .with_notifier(Arc::new(notifier.clone()));

    TestApp {
        router: create_app(state.clone()),
        state,
        notifier,
        dir,
    }
}

/// JSON POST request.
pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Form-encoded POST request.
pub fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// GET request without credentials.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// GET request with the admin bearer token.
pub fn admin_get(uri: &str) -> Request<Body> {
    get_request_with_header(uri, header::AUTHORIZATION.as_str(), &format!("Bearer {}", ADMIN_TOKEN))
}

pub fn get_request_with_header(uri: &str, name: &str, value: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(name, value)
        .body(Body::empty())
        .unwrap()
}

pub fn basic_auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass)))
}

/// Parse a JSON response body.
pub async fn parse_response_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!(
            "Failed to parse response body: {:?}",
            String::from_utf8_lossy(&body)
        )
    })
}

pub async fn response_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// A valid booking payload with generated contact details.
pub fn fake_booking() -> Value {
    let name: String = Name().fake();
    let phone: String = PhoneNumber().fake();
    json!({
        "name": name,
        "phone": phone,
        "email": "visitor@example.com",
        "service": "Kundli Reading",
        "date": "2025-03-14",
        "time": "10:30",
        "message": "Career questions"
    })
}

/// Waits until the recording notifier has seen `count` alerts.
pub async fn wait_for_notifications(
    notifier: &MockNotificationService,
    count: usize,
) -> Vec<SubmissionNotification> {
    for _ in 0..100 {
        let sent = notifier.sent();
        if sent.len() >= count {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "Expected {} notifications, got {}",
        count,
        notifier.sent().len()
    );
}
