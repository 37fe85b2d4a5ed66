//! HTTP route handlers.

pub mod admin;
pub mod health;
pub mod submissions;

use axum::http::Uri;

use crate::error::ApiError;

/// JSON 404 for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
