//! Client for the hosted table API (Supabase PostgREST).
//!
//! Only two operations are needed: insert one row into a table and select
//! the newest rows of a table.

use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::metrics::record_upstream_request;

/// Upstream connection settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Service role key, sent as `apikey` and bearer token.
    pub service_key: String,
    /// Bound on every outbound request.
    pub timeout_secs: u64,
}

/// Errors returned by the upstream table API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed upstream response: {0}")]
    MalformedBody(String),
}

impl UpstreamError {
    /// True when the request hit the configured timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Http(e) if e.is_timeout())
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            UpstreamError::Http(e) if e.is_timeout() => "timeout",
            UpstreamError::Http(_) => "transport_error",
            UpstreamError::Status { .. } => "status_error",
            UpstreamError::MalformedBody(_) => "malformed",
        }
    }
}

/// Select parameters for [`SupabaseClient::select`].
#[derive(Debug, Clone)]
pub struct SelectQuery {
    /// PostgREST order expression.
    pub order: String,
    pub limit: usize,
}

impl SelectQuery {
    /// Newest rows first, as the admin views expect.
    pub fn newest_first(limit: usize) -> Self {
        Self {
            order: "created_at.desc".to_string(),
            limit,
        }
    }
}

/// HTTP client bound to one Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    base_url: String,
    service_key: String,
    client: Client,
}

impl SupabaseClient {
    /// Creates a client with the configured request timeout.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Inserts one row and returns the stored representation, if any.
    pub async fn insert(&self, table: &str, row: &Value) -> Result<Option<Value>, UpstreamError> {
        let start = Instant::now();
        let result = self.insert_inner(table, row).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome_label(),
        };
        record_upstream_request(table, "insert", outcome, start.elapsed().as_secs_f64());
        result
    }

    async fn insert_inner(&self, table: &str, row: &Value) -> Result<Option<Value>, UpstreamError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::MalformedBody(e.to_string()))?;

        match parsed {
            Value::Array(mut rows) => {
                debug!(table = %table, rows = rows.len(), "Upstream insert acknowledged");
                if rows.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(rows.swap_remove(0)))
                }
            }
            Value::Object(_) => Ok(Some(parsed)),
            other => Err(UpstreamError::MalformedBody(format!(
                "expected inserted rows, got {}",
                other
            ))),
        }
    }

    /// Selects rows from a table.
    pub async fn select(&self, table: &str, query: &SelectQuery) -> Result<Vec<Value>, UpstreamError> {
        let start = Instant::now();
        let result = self.select_inner(table, query).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome_label(),
        };
        record_upstream_request(table, "select", outcome, start.elapsed().as_secs_f64());
        result
    }

    async fn select_inner(
        &self,
        table: &str,
        query: &SelectQuery,
    ) -> Result<Vec<Value>, UpstreamError> {
        let limit = query.limit.to_string();
        let response = self
            .client
            .get(self.table_url(table))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .query(&[
                ("select", "*"),
                ("order", query.order.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<Vec<Value>>(&body)
            .map_err(|e| UpstreamError::MalformedBody(e.to_string()))
    }
}
