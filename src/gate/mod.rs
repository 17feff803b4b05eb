//! Shared-password access gate.
//!
//! Every request goes through [`require_password`] before reaching a route.
//! Without a configured password the gate lets everything through. With one,
//! a request passes only when it carries a `quiz_auth` cookie holding the
//! encoded password; otherwise the login form is served in place of the
//! requested page and `POST /_auth` trades the right password for the cookie.

pub mod cookie;
pub mod login;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, instrument};

use self::{
    cookie::{auth_token, constant_time_eq, read_cookie, AUTH_COOKIE_NAME},
    login::{login_page, safe_redirect, LOGIN_PATH},
};

pub const DEFAULT_BYPASS_PREFIX: &str = "/_internal";

#[derive(Debug, Clone)]
pub struct GateConfig {
    password: Option<SecretString>,
    bypass_prefix: String,
    title: String,
}

impl GateConfig {
    #[must_use]
    pub fn new(password: Option<SecretString>, bypass_prefix: impl Into<String>) -> Self {
        Self {
            password,
            bypass_prefix: bypass_prefix.into(),
            title: "Speech Quiz".to_string(),
        }
    }

    /// A gate that lets every request through.
    #[must_use]
    pub fn open() -> Self {
        Self::new(None, DEFAULT_BYPASS_PREFIX)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.password.is_none()
    }

    #[must_use]
    pub fn bypass_prefix(&self) -> &str {
        &self.bypass_prefix
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    fn bypasses(&self, path: &str) -> bool {
        !self.bypass_prefix.is_empty() && path.starts_with(&self.bypass_prefix)
    }
}

/// Axum middleware enforcing the gate.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn require_password(
    State(gate): State<Arc<GateConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(password) = gate.password.as_ref() else {
        return next.run(request).await;
    };

    let path = request.uri().path();
    if gate.bypasses(path) {
        return next.run(request).await;
    }

    if request.method() == Method::POST && path == LOGIN_PATH {
        return login::submit(&gate, password, request).await;
    }

    let expected = auth_token(password);
    let authorized = read_cookie(request.headers(), AUTH_COOKIE_NAME)
        .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()));
    if authorized {
        return next.run(request).await;
    }

    debug!("no valid auth cookie, serving login page");
    let redirect = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.to_string(), ToString::to_string);
    login_page(&gate, false, &safe_redirect(Some(&redirect)))
}
