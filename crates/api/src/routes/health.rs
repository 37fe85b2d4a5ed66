//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: String,
    pub version: String,
    pub storage: StorageHealth,
    pub upstream: UpstreamHealth,
    pub notifications: NotificationHealth,
}

/// Local store status.
#[derive(Debug, Serialize)]
pub struct StorageHealth {
    /// Whether the data directory is reachable.
    pub available: bool,
}

/// Upstream table API status. Only configuration is reported; the health
/// check never calls out.
#[derive(Debug, Serialize)]
pub struct UpstreamHealth {
    pub configured: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationHealth {
    pub enabled: bool,
    pub provider: String,
}

/// Health check endpoint.
///
/// GET /health, GET /api/health
///
/// Answers 503 when the local store directory is unavailable, since no
/// submission can be accepted without it.
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let available = tokio::fs::metadata(state.store.local().data_dir())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let response = HealthResponse {
        ok: available,
        status: if available { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: StorageHealth { available },
        upstream: UpstreamHealth {
            configured: state.store.upstream().is_some(),
        },
        notifications: NotificationHealth {
            enabled: state.notifier.is_enabled(),
            provider: state.notifier.provider().to_string(),
        },
    };

    let status = if available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
