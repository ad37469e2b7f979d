// ============================
// crates/backend-lib/src/middleware/cookie.rs
// ============================
//! Session cookie parsing and `Set-Cookie` values.
use crate::config::SessionSettings;
use axum::http::{header, HeaderMap};

/// Session token carried by the request's `Cookie` header(s), if any
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value binding the client to `token`
pub fn session_cookie(settings: &SessionSettings, token: &str) -> String {
    let mut cookie = format!(
        "{}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        settings.cookie_name, settings.absolute_ttl_secs
    );
    if settings.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the client drop its session cookie
pub fn clear_session_cookie(settings: &SessionSettings) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        settings.cookie_name
    );
    if settings.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}
