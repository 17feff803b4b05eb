//! Cookie helpers shared by the gate and the quiz session.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};

pub const AUTH_COOKIE_NAME: &str = "quiz_auth";

/// Seven days.
pub const AUTH_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 7;

/// Cookie value expected for a password: its standard, padded base64 form.
#[must_use]
pub fn auth_token(password: &SecretString) -> String {
    Base64::encode_string(password.expose_secret().as_bytes())
}

/// `HttpOnly`, `SameSite=Strict` cookie scoped to the whole site.
///
/// # Errors
/// Returns an error if the value cannot be carried in a header.
pub fn strict_cookie(
    name: &str,
    value: &str,
    max_age: Option<u64>,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Strict");
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    HeaderValue::from_str(&cookie)
}

/// Find a cookie value by name. Values keep any `=` they contain, which
/// matters for base64 padding.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
}

/// Compare two byte strings without stopping at the first difference.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn token_is_padded_base64() {
        assert_eq!(auth_token(&SecretString::from("p".to_string())), "cA==");
        assert_eq!(auth_token(&SecretString::from("secret".to_string())), "c2VjcmV0");
    }

    #[test]
    fn strict_cookie_attributes() -> Result<()> {
        let cookie = strict_cookie(AUTH_COOKIE_NAME, "cA==", Some(AUTH_COOKIE_MAX_AGE))?;
        assert_eq!(
            cookie.to_str()?,
            "quiz_auth=cA==; Path=/; HttpOnly; SameSite=Strict; Max-Age=604800"
        );

        let session = strict_cookie("quiz_session", "abc", None)?;
        assert_eq!(session.to_str()?, "quiz_session=abc; Path=/; HttpOnly; SameSite=Strict");
        Ok(())
    }

    #[test]
    fn read_cookie_keeps_padding() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; quiz_auth=cA==; other=1"),
        );
        assert_eq!(read_cookie(&headers, AUTH_COOKIE_NAME), Some("cA==".to_string()));
        assert_eq!(read_cookie(&headers, "theme"), Some("dark".to_string()));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn read_cookie_ignores_prefix_matches() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("quiz_auth_old=x; junk"));
        assert_eq!(read_cookie(&headers, AUTH_COOKIE_NAME), None);
    }

    #[test]
    fn read_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("quiz_auth=c2VjcmV0"));
        assert_eq!(
            read_cookie(&headers, AUTH_COOKIE_NAME),
            Some("c2VjcmV0".to_string())
        );
    }

    #[test]
    fn constant_time_eq_compares_content_and_length() {
        assert!(constant_time_eq(b"cA==", b"cA=="));
        assert!(!constant_time_eq(b"cA==", b"cB=="));
        assert!(!constant_time_eq(b"cA==", b"cA="));
        assert!(constant_time_eq(b"", b""));
    }
}
