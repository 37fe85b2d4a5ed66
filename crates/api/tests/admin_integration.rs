//! Integration tests for the admin read and export endpoints.

mod common;

use axum::http::{header, StatusCode};
use common::{
    admin_get, basic_auth_header, fake_booking, get_request, get_request_with_header,
    json_request, parse_response_body, response_text, spawn_app, spawn_app_with, test_config,
    test_config_with_upstream, TestApp, ADMIN_PASS, ADMIN_TOKEN, ADMIN_USER, SERVICE_KEY,
};
use serde_json::json;
use wiremock::matchers::{header as header_matcher, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn submit_enquiries(app: &TestApp, count: usize) {
    for n in 1..=count {
        let response = app
            .send(json_request(
                "/api/enquire",
                json!({ "name": format!("Visitor {n}"), "message": format!("Question {n}") }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_admin_requires_credentials() {
    let app = spawn_app().await;
    submit_enquiries(&app, 2).await;

    let response = app.send(get_request("/api/admin/enquiries")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        r#"Basic realm="Admin Area""#
    );
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "unauthorized");

    let response = app.send(admin_get("/api/admin/enquiries")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_admin_rejects_wrong_token() {
    let app = spawn_app().await;

    let response = app
        .send(get_request_with_header(
            "/api/admin/bookings",
            "authorization",
            "Bearer not-the-token",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_key_headers_accepted() {
    let app = spawn_app().await;

    for name in ["x-admin-api-key", "x-admin-key"] {
        let response = app
            .send(get_request_with_header("/api/admin/payments", name, ADMIN_TOKEN))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "header {name}");
    }
}

#[tokio::test]
async fn test_admin_basic_auth() {
    let app = spawn_app().await;

    let response = app
        .send(get_request_with_header(
            "/api/admin/bookings",
            "authorization",
            &basic_auth_header(ADMIN_USER, ADMIN_PASS),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(get_request_with_header(
            "/api/admin/bookings",
            "authorization",
            &basic_auth_header(ADMIN_USER, "wrong"),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_basic_auth_disabled_without_password() {
    let app = spawn_app_with(|dir| {
        let mut config = test_config(dir);
        config.admin.password = String::new();
        config
    })
    .await;

    let response = app
        .send(get_request_with_header(
            "/api/admin/bookings",
            "authorization",
            &basic_auth_header(ADMIN_USER, ""),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

    let response = app.send(admin_get("/api/admin/bookings")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_locked_when_nothing_configured() {
    let app = spawn_app_with(|dir| {
        let mut config = test_config(dir);
        config.admin.api_key = String::new();
        config.admin.username = String::new();
        config.admin.password = String::new();
        config
    })
    .await;

    let response = app
        .send(get_request_with_header(
            "/api/admin/bookings",
            "authorization",
            "Bearer ",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_exports_require_credentials() {
    let app = spawn_app().await;

    let response = app
        .send(get_request("/api/admin/export/bookings.csv"))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Local lists
// ============================================================================

#[tokio::test]
async fn test_list_is_newest_first_and_limited() {
    let app = spawn_app().await;
    submit_enquiries(&app, 3).await;

    let response = app.send(admin_get("/api/admin/enquiries?limit=2")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["rows"][0]["name"], "Visitor 3");
    assert_eq!(body["rows"][1]["name"], "Visitor 2");
}

#[tokio::test]
async fn test_list_rejects_bad_limit() {
    let app = spawn_app().await;

    for limit in ["0", "1001", "many"] {
        let response = app
            .send(admin_get(&format!("/api/admin/bookings?limit={limit}")))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "limit {limit}");
        let body = parse_response_body(response).await;
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_lists_are_separated_by_kind() {
    let app = spawn_app().await;
    app.send(json_request("/api/book", fake_booking())).await;
    submit_enquiries(&app, 2).await;

    let bookings = parse_response_body(app.send(admin_get("/api/admin/bookings")).await).await;
    let enquiries =
        parse_response_body(app.send(admin_get("/api/admin/enquiries")).await).await;
    let payments = parse_response_body(app.send(admin_get("/api/admin/payments")).await).await;

    assert_eq!(bookings["count"], 1);
    assert_eq!(enquiries["count"], 2);
    assert_eq!(payments["count"], 0);
    assert_eq!(payments["rows"], json!([]));
}

// ============================================================================
// Remote lists
// ============================================================================

#[tokio::test]
async fn test_remote_list_reads_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/bookings"))
        .and(header_matcher("apikey", SERVICE_KEY))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 12, "name": "Remote Two" },
            { "id": 11, "name": "Remote One" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let app = spawn_app_with(|dir| {
        let mut config = test_config_with_upstream(dir, &uri);
        config.admin.read_source = "remote".to_string();
        config
    })
    .await;

    let response = app.send(admin_get("/api/admin/bookings?limit=5")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["source"], "remote");
    assert_eq!(body["count"], 2);
    assert_eq!(body["rows"][0]["name"], "Remote Two");
}

#[tokio::test]
async fn test_remote_list_upstream_error_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/payments"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let app = spawn_app_with(|dir| {
        let mut config = test_config_with_upstream(dir, &uri);
        config.admin.read_source = "remote".to_string();
        config
    })
    .await;

    let response = app.send(admin_get("/api/admin/payments")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "upstream_error");
    assert_eq!(body["detail"], "invalid api key");
}

#[tokio::test]
async fn test_remote_list_without_upstream_is_internal_error() {
    let app = spawn_app_with(|dir| {
        let mut config = test_config(dir);
        config.admin.read_source = "remote".to_string();
        config
    })
    .await;

    let response = app.send(admin_get("/api/admin/enquiries")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// CSV export
// ============================================================================

#[tokio::test]
async fn test_csv_export_in_insertion_order() {
    let app = spawn_app().await;
    submit_enquiries(&app, 2).await;
    app.send(json_request(
        "/api/enquire",
        json!({ "email": "q@example.com", "message": "He said \"hi\"" }),
    ))
    .await;

    let response = app
        .send(admin_get("/api/admin/export/enquiries.csv"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"enquiries.csv\""
    );

    let text = response_text(response).await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        r#""id","createdAt","name","phone","email","message""#
    );
    assert!(lines[1].contains(r#""Visitor 1""#));
    assert!(lines[2].contains(r#""Visitor 2""#));
    assert!(lines[3].contains(r#""He said ""hi""""#));
}

#[tokio::test]
async fn test_csv_export_payments_with_basic_auth() {
    let app = spawn_app().await;
    app.send(json_request(
        "/api/payment",
        json!({ "name": "Asha", "amount": "199.50", "service": "Tarot" }),
    ))
    .await;

    let response = app
        .send(get_request_with_header(
            "/api/admin/export/payments.csv",
            "authorization",
            &basic_auth_header(ADMIN_USER, ADMIN_PASS),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = response_text(response).await;
    let data = text.lines().nth(1).unwrap();
    assert!(data.contains(r#""199.5""#));
    assert!(data.ends_with(r#""Tarot","PENDING""#));
}

#[tokio::test]
async fn test_csv_export_empty_has_header_only() {
    let app = spawn_app().await;

    let response = app
        .send(admin_get("/api/admin/export/bookings.csv"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let text = response_text(response).await;
    assert_eq!(text.lines().count(), 1);
    assert!(text.starts_with(r#""id","createdAt","name""#));
}
