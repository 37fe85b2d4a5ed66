//! Admin authentication middleware.
//!
//! Admin routes accept either the shared admin secret (bearer token or admin
//! key header) or HTTP Basic credentials. There is no session state.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{
    authorization::{Basic, Bearer},
    Authorization, HeaderMapExt,
};
use shared::crypto::secrets_match;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::config::AdminConfig;
use crate::error::ApiError;

/// Alternative headers carrying the admin secret.
pub const ADMIN_KEY_HEADERS: [&str; 2] = ["x-admin-api-key", "x-admin-key"];

/// Challenge sent when Basic authentication is available.
pub const BASIC_CHALLENGE: &str = r#"Basic realm="Admin Area""#;

/// How an admin request authenticated. Stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAuth {
    Token,
    Basic,
}

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let admin = &state.config.admin;

    match authenticate(req.headers(), admin) {
        Some(method) => {
            debug!(method = ?method, path = %req.uri().path(), "Admin request authenticated");
            req.extensions_mut().insert(method);
            next.run(req).await
        }
        None => {
            warn!(path = %req.uri().path(), "Admin request rejected");
            unauthorized_response(admin.basic_enabled())
        }
    }
}

/// Checks the request headers against the configured admin credentials.
pub fn authenticate(headers: &HeaderMap, admin: &AdminConfig) -> Option<AdminAuth> {
    if admin.token_enabled() {
        if let Some(token) = supplied_token(headers) {
            if secrets_match(&token, &admin.api_key) {
                return Some(AdminAuth::Token);
            }
        }
    }

    if admin.basic_enabled() {
        if let Some(Authorization(basic)) = headers.typed_get::<Authorization<Basic>>() {
            // Evaluate both so timing does not reveal which one differed.
            let user_ok = secrets_match(basic.username(), &admin.username);
            let pass_ok = secrets_match(basic.password(), &admin.password);
            if user_ok & pass_ok {
                return Some(AdminAuth::Basic);
            }
        }
    }

    None
}

fn supplied_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Some(bearer.token().to_string());
    }

    ADMIN_KEY_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// 401 response, with a Basic challenge when that path is configured.
fn unauthorized_response(challenge: bool) -> Response {
    let mut response = ApiError::Unauthorized("Admin credentials required".into()).into_response();
    if challenge {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(BASIC_CHALLENGE),
        );
    }
    response
}
