//! HTTP basic auth

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::warn;

use super::routes::AppState;

pub const REALM: &str = r#"Basic realm="Restricted safe""#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }

    /// Whether an `Authorization` header carries these credentials
    pub fn accepts(&self, header: Option<&HeaderValue>) -> bool {
        let Some(encoded) = header
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Basic "))
        else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        match decoded.split_once(':') {
            Some((user, pass)) => user == self.user && pass == self.pass,
            None => false,
        }
    }
}

/// Reject requests without valid credentials when auth is configured
pub async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(credentials) = &state.auth {
        if !credentials.accepts(request.headers().get(AUTHORIZATION)) {
            warn!("Unauthorized request for {}", request.uri().path());
            return unauthorized();
        }
    }
    next.run(request).await
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, REALM)],
        "Unauthorized.\n",
    )
        .into_response()
}
