// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod auth;
pub mod federated;
pub mod pages;
pub mod secrets;

use axum::{
    http::header,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};

/// 303 to `location`, optionally (re)setting the session cookie
pub(crate) fn redirect_with_cookie(location: &str, cookie: Option<String>) -> Response {
    match cookie {
        Some(cookie) => (
            AppendHeaders([(header::SET_COOKIE, cookie)]),
            Redirect::to(location),
        )
            .into_response(),
        None => Redirect::to(location).into_response(),
    }
}
