use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::NotificationService;
use persistence::{
    LocalStore, LocalStoreError, SupabaseClient, UpstreamConfig, UpstreamError, WriteThroughStore,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, security_headers_middleware, trace_id,
};
use crate::routes::{admin, health, not_found, submissions};
use crate::services::{Notifier, NotifyError};

/// Errors raised while assembling the application state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Local store unavailable: {0}")]
    Store(#[from] LocalStoreError),

    #[error("Upstream client setup failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Notifier setup failed: {0}")]
    Notify(#[from] NotifyError),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<WriteThroughStore>,
    pub notifier: Arc<dyn NotificationService>,
}

impl AppState {
    /// Opens the local store and builds the upstream client and notifier.
    pub async fn new(config: Config) -> Result<Self, StartupError> {
        let local = LocalStore::open(&config.storage.data_dir).await?;

        let upstream = if config.upstream.is_configured() {
            Some(SupabaseClient::new(&UpstreamConfig {
                url: config.upstream.url.clone(),
                service_key: config.upstream.service_key.clone(),
                timeout_secs: config.upstream.timeout_secs,
            })?)
        } else {
            None
        };

        info!(
            data_dir = %config.storage.data_dir,
            upstream = upstream.is_some(),
            "Storage ready"
        );
        if upstream.is_none() {
            info!("Upstream not configured, running in local-only mode");
        }

        let notifier = Notifier::from_config(&config.notify)?;

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(WriteThroughStore::new(upstream, local)),
            notifier: Arc::new(notifier),
        })
    }

    /// Replaces the notifier.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationService>) -> Self {
        self.notifier = notifier;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public form submissions
    let submission_routes = Router::new()
        .route("/api/book", post(submissions::create_booking))
        .route("/api/enquire", post(submissions::create_enquiry))
        .route("/api/payment", post(submissions::create_payment));

    // Admin routes (bearer token, admin key header or Basic auth)
    let admin_routes = Router::new()
        .route("/api/admin/bookings", get(admin::list_bookings))
        .route("/api/admin/enquiries", get(admin::list_enquiries))
        .route("/api/admin/payments", get(admin::list_payments))
        .route("/api/admin/export/bookings.csv", get(admin::export_bookings))
        .route(
            "/api/admin/export/enquiries.csv",
            get(admin::export_enquiries),
        )
        .route("/api/admin/export/payments.csv", get(admin::export_payments))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(submission_routes)
        .merge(admin_routes)
        .fallback(not_found)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
