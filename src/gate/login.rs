//! Login page and credential submission.

use super::{
    cookie::{auth_token, constant_time_eq, strict_cookie, AUTH_COOKIE_MAX_AGE, AUTH_COOKIE_NAME},
    GateConfig,
};
use axum::{
    body::to_bytes,
    extract::Request,
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/_auth";

const MAX_FORM_BYTES: usize = 16 * 1024;

/// Handle `POST /_auth`.
///
/// A body that cannot be read counts as an empty password, so malformed
/// submissions end up on the retry page like any other wrong password.
pub(super) async fn submit(gate: &GateConfig, password: &SecretString, request: Request) -> Response {
    let redirect = safe_redirect(query_param(request.uri().query(), "redirect").as_deref());

    let submitted = match to_bytes(request.into_body(), MAX_FORM_BYTES).await {
        Ok(body) => form_urlencoded::parse(&body)
            .find(|(key, _)| key == "password")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default(),
        Err(err) => {
            debug!("unreadable login body: {err}");
            String::new()
        }
    };

    if !constant_time_eq(submitted.as_bytes(), password.expose_secret().as_bytes()) {
        warn!("login rejected");
        return login_page(gate, true, &redirect);
    }

    info!("login accepted, redirecting to {redirect}");
    let token = auth_token(password);

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&redirect).unwrap_or_else(|_| HeaderValue::from_static("/"));
    headers.insert(LOCATION, location);
    match strict_cookie(AUTH_COOKIE_NAME, &token, Some(AUTH_COOKIE_MAX_AGE)) {
        Ok(cookie) => {
            headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            warn!("failed to build auth cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    (StatusCode::FOUND, headers).into_response()
}

/// Render the login form. Failed attempts get `401` and an error line,
/// first visits get `200`.
pub(super) fn login_page(gate: &GateConfig, error: bool, redirect: &str) -> Response {
    let status = if error {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::OK
    };
    (status, Html(render(gate.title(), error, redirect))).into_response()
}

/// Only same-origin absolute paths are followed after login.
#[must_use]
pub fn safe_redirect(target: Option<&str>) -> String {
    match target {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

fn render(title: &str, error: bool, redirect: &str) -> String {
    let action: String = form_urlencoded::byte_serialize(redirect.as_bytes()).collect();
    let error_line = if error {
        r#"<p class="error">Incorrect password, try again.</p>"#
    } else {
        ""
    };
    let title = escape_html(title);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0, user-scalable=no" />
  <title>{title} - Login</title>
  <style>
    body {{ display: flex; align-items: center; justify-content: center; min-height: 100vh;
      margin: 0; background: #0f1117; color: #e2e8f0;
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; }}
    .card {{ width: 100%; max-width: 360px; background: #1a1d27; border-radius: 20px;
      padding: 40px 32px; display: flex; flex-direction: column; gap: 20px; align-items: center; }}
    form {{ width: 100%; display: flex; flex-direction: column; gap: 16px; }}
    input[type="password"] {{ padding: 14px 16px; background: #23263a; border: 1px solid #333;
      border-radius: 12px; color: #e2e8f0; font-size: 1rem; }}
    button {{ padding: 14px; background: #6c63ff; color: #fff; border: none; border-radius: 99px;
      font-size: 1rem; font-weight: 600; cursor: pointer; }}
    .error {{ color: #f87171; font-size: 0.85rem; text-align: center; }}
  </style>
</head>
<body>
  <div class="card">
    <h1>{title}</h1>
    <form method="POST" action="{LOGIN_PATH}?redirect={action}">
      <input type="password" name="password" placeholder="Enter password" autofocus autocomplete="current-password" />
      <button type="submit">Enter</button>
    </form>
    {error_line}
  </div>
</body>
</html>"#
    )
}

fn escape_html(text: &str) -> String {
    text.chars()
        .fold(String::with_capacity(text.len()), |mut acc, ch| {
            match ch {
                '&' => acc.push_str("&amp;"),
                '<' => acc.push_str("&lt;"),
                '>' => acc.push_str("&gt;"),
                '"' => acc.push_str("&quot;"),
                '\'' => acc.push_str("&#39;"),
                _ => acc.push(ch),
            }
            acc
        })
}
