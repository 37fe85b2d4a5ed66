//! Admin read and export endpoints.
//!
//! All routes here sit behind [`crate::middleware::admin_auth::require_admin`].

use axum::{
    extract::{Extension, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::RecordKind;
use persistence::SelectQuery;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::config::ReadSource;
use crate::error::ApiError;
use crate::middleware::AdminAuth;

/// Largest page an admin list returns.
pub const MAX_LIST_LIMIT: usize = 1000;

/// Query parameters for admin lists.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Kept as text so a bad value yields a JSON validation error.
    pub limit: Option<String>,
}

impl ListQuery {
    fn limit(&self) -> Result<usize, ApiError> {
        let Some(raw) = self.limit.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(MAX_LIST_LIMIT);
        };
        match raw.parse::<usize>() {
            Ok(n) if (1..=MAX_LIST_LIMIT).contains(&n) => Ok(n),
            _ => Err(ApiError::validation(format!(
                "limit must be between 1 and {}",
                MAX_LIST_LIMIT
            ))),
        }
    }
}

/// Admin list response.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub ok: bool,
    pub source: &'static str,
    pub count: usize,
    pub rows: Vec<Value>,
}

/// GET /api/admin/bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AdminAuth>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    list(&state, auth, RecordKind::Booking, &query).await
}

/// GET /api/admin/enquiries
pub async fn list_enquiries(
    State(state): State<AppState>,
    Extension(auth): Extension<AdminAuth>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    list(&state, auth, RecordKind::Enquiry, &query).await
}

/// GET /api/admin/payments
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AdminAuth>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    list(&state, auth, RecordKind::Payment, &query).await
}

async fn list(
    state: &AppState,
    auth: AdminAuth,
    kind: RecordKind,
    query: &ListQuery,
) -> Result<Json<ListResponse>, ApiError> {
    let limit = query.limit()?;

    let (source, rows) = match state.config.admin.read_source() {
        ReadSource::Local => (
            "local",
            state.store.local().read_newest(kind, limit).await?,
        ),
        ReadSource::Remote => {
            let client = state.store.upstream().ok_or_else(|| {
                ApiError::Internal("Remote admin reads need upstream configuration".into())
            })?;
            (
                "remote",
                client
                    .select(kind.table(), &SelectQuery::newest_first(limit))
                    .await?,
            )
        }
    };

    info!(kind = %kind, source, count = rows.len(), auth = ?auth, "Admin list served");

    Ok(Json(ListResponse {
        ok: true,
        source,
        count: rows.len(),
        rows,
    }))
}

/// GET /api/admin/export/bookings.csv
pub async fn export_bookings(
    State(state): State<AppState>,
    Extension(auth): Extension<AdminAuth>,
) -> Result<Response, ApiError> {
    export(&state, auth, RecordKind::Booking).await
}

/// GET /api/admin/export/enquiries.csv
pub async fn export_enquiries(
    State(state): State<AppState>,
    Extension(auth): Extension<AdminAuth>,
) -> Result<Response, ApiError> {
    export(&state, auth, RecordKind::Enquiry).await
}

/// GET /api/admin/export/payments.csv
pub async fn export_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AdminAuth>,
) -> Result<Response, ApiError> {
    export(&state, auth, RecordKind::Payment).await
}

/// Exports the local mirror in insertion order.
async fn export(
    state: &AppState,
    auth: AdminAuth,
    kind: RecordKind,
) -> Result<Response, ApiError> {
    let rows = state.store.local().read_all(kind).await?;
    let body = render_csv(kind.csv_columns(), &rows)?;
    let disposition = format!("attachment; filename=\"{}.csv\"", kind.table());

    info!(kind = %kind, rows = rows.len(), auth = ?auth, "Admin export served");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Renders rows as CSV with every field quoted.
pub fn render_csv(columns: &[&str], rows: &[Value]) -> Result<String, ApiError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .from_writer(Vec::new());

    let csv_error = |e: csv::Error| ApiError::Internal(format!("CSV export failed: {}", e));

    writer.write_record(columns).map_err(csv_error)?;
    for row in rows {
        writer
            .write_record(columns.iter().map(|column| cell(row.get(*column))))
            .map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Internal(format!("CSV export failed: {}", e)))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
