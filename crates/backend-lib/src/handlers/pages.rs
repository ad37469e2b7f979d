// ============================
// crates/backend-lib/src/handlers/pages.rs
// ============================
//! Static HTML pages and the health probe.
use crate::storage::CredentialStore;
use crate::AppState;
use axum::{extract::State, http::HeaderMap, response::Html, Json};
use serde_json::{json, Value};
use std::sync::Arc;

const HOME_ANONYMOUS: &str = r#"<!doctype html>
<html><head><title>Secrets</title></head><body>
<h1>Secrets</h1>
<p>Don't keep your secrets, share them anonymously!</p>
<a href="/register">Register</a> <a href="/login">Login</a>
</body></html>"#;

const HOME_SIGNED_IN: &str = r#"<!doctype html>
<html><head><title>Secrets</title></head><body>
<h1>Secrets</h1>
<a href="/secrets">Read secrets</a> <a href="/submit">Submit a secret</a> <a href="/logout">Log out</a>
</body></html>"#;

const LOGIN_PAGE: &str = r#"<!doctype html>
<html><head><title>Login</title></head><body>
<h1>Login</h1>
<form action="/login" method="POST">
  <input type="text" name="username" placeholder="Email" required>
  <input type="password" name="password" placeholder="Password" required>
  <button type="submit">Login</button>
</form>
<a href="/auth/google">Sign in with Google</a>
<a href="/auth/facebook">Sign in with Facebook</a>
</body></html>"#;

const REGISTER_PAGE: &str = r#"<!doctype html>
<html><head><title>Register</title></head><body>
<h1>Register</h1>
<form action="/register" method="POST">
  <input type="text" name="username" placeholder="Email" required>
  <input type="password" name="password" placeholder="Password" required>
  <button type="submit">Register</button>
</form>
<a href="/auth/google">Sign up with Google</a>
<a href="/auth/facebook">Sign up with Facebook</a>
</body></html>"#;

const SUBMIT_PAGE: &str = r#"<!doctype html>
<html><head><title>Submit a secret</title></head><body>
<h1>Secrets</h1>
<p>Don't keep your secrets, share them anonymously!</p>
<form action="/submit" method="POST">
  <input type="text" name="secret" placeholder="What's your secret?" required>
  <button type="submit">Submit</button>
</form>
</body></html>"#;

/// `GET /`
pub async fn home<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Html<&'static str> {
    let token = state.session_token(&headers);
    if state.resolver.is_authenticated(token.as_deref()).await {
        Html(HOME_SIGNED_IN)
    } else {
        Html(HOME_ANONYMOUS)
    }
}

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

pub async fn register_page() -> Html<&'static str> {
    Html(REGISTER_PAGE)
}

/// `GET /submit` (gated)
pub async fn submit_page() -> Html<&'static str> {
    Html(SUBMIT_PAGE)
}

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
