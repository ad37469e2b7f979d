// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Local login, registration and logout.
use super::redirect_with_cookie;
use crate::error::AppError;
use crate::storage::CredentialStore;
use crate::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use secrets_common::Credentials;
use std::sync::Arc;

/// `POST /login`
///
/// A match binds the session and continues to `/secrets`. Unknown username
/// and wrong password are reported identically: back to `/login`, session
/// untouched.
pub async fn login<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Form(credentials): Form<Credentials>,
) -> Result<Response, AppError> {
    let current = state.session_token(&headers);
    match state.auth.login(&credentials).await {
        Ok(identity) => {
            let token = state.resolver.login(current.as_deref(), &identity).await?;
            Ok(redirect_with_cookie(
                "/secrets",
                Some(state.session_cookie(&token)),
            ))
        },
        Err(AppError::InvalidCredentials | AppError::NotFound(_)) => {
            Ok(Redirect::to("/login").into_response())
        },
        Err(e) => Err(e),
    }
}

/// `POST /register`
///
/// Creates a local identity and signs it in. Policy violations and taken
/// usernames return the user to the registration form.
pub async fn register<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Form(credentials): Form<Credentials>,
) -> Result<Response, AppError> {
    let identity = match state.auth.register(&credentials).await {
        Ok(identity) => identity,
        Err(e @ (AppError::InvalidInput(_) | AppError::DuplicateKey { .. })) => {
            tracing::warn!(error = %e, "registration rejected");
            return Ok(Redirect::to("/register").into_response());
        },
        Err(e) => return Err(e),
    };

    let current = state.session_token(&headers);
    let token = state.resolver.login(current.as_deref(), &identity).await?;
    Ok(redirect_with_cookie(
        "/secrets",
        Some(state.session_cookie(&token)),
    ))
}

/// `GET /logout`
pub async fn logout<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Response {
    let current = state.session_token(&headers);
    state.resolver.logout(current.as_deref()).await;
    redirect_with_cookie("/", Some(state.clear_session_cookie()))
}
