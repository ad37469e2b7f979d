// ============================
// crates/backend-lib/src/handlers/federated.rs
// ============================
//! Federated login: `/auth/{provider}` and its callback.
//!
//! Every failure on the callback path that is the provider's or the
//! client's doing ends on `/login`. Storage failures surface as an error
//! response. Neither ever reaches the protected page.
use super::redirect_with_cookie;
use crate::auth::token_generator::generate_secure_token;
use crate::auth::ProviderClient;
use crate::error::AppError;
use crate::storage::CredentialStore;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use secrets_common::{Identity, Provider, ProviderProfile};
use serde::Deserialize;
use std::sync::Arc;

/// Query string the provider appends to the callback URL
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn configured_provider<S>(
    state: &AppState<S>,
    name: &str,
) -> Result<(Provider, Arc<dyn ProviderClient>), AppError> {
    let provider: Provider = name
        .parse()
        .map_err(|_| AppError::NotFound(format!("provider {name}")))?;
    let client = state
        .providers
        .get(provider)
        .ok_or_else(|| AppError::NotFound(format!("provider {provider}")))?;
    Ok((provider, client))
}

fn to_login() -> Response {
    Redirect::to("/login").into_response()
}

/// `GET /auth/{provider}`: hand the browser to the provider
pub async fn begin<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (provider, client) = configured_provider(&*state, &provider)?;

    let current = state.session_token(&headers);
    let (token, created) = state.resolver.ensure_session(current.as_deref()).await;
    let csrf_state = generate_secure_token();
    state
        .resolver
        .begin_federated(&token, provider, csrf_state.clone())
        .await;

    tracing::debug!(%provider, "federated login started");
    let cookie = created.then(|| state.session_cookie(&token));
    Ok(redirect_with_cookie(&client.authorize_url(&csrf_state), cookie))
}

/// `GET /auth/{provider}/secrets`: provider callback
pub async fn callback<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (provider, client) = configured_provider(&*state, &provider)?;
    let current = state.session_token(&headers);

    // Consume the pending state first so it cannot be replayed
    let returned_state = params.state.as_deref().unwrap_or_default();
    let state_ok = state
        .resolver
        .finish_federated(current.as_deref(), provider, returned_state)
        .await;

    if let Some(error) = params.error.as_deref() {
        tracing::warn!(%provider, %error, "provider denied authorization");
        return Ok(to_login());
    }
    if !state_ok {
        tracing::warn!(%provider, "federated callback with mismatched state");
        return Ok(to_login());
    }
    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        tracing::warn!(%provider, "federated callback without code");
        return Ok(to_login());
    };

    let profile = match client.exchange_code(code).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(%provider, error = %e, "code exchange failed");
            return Ok(to_login());
        },
    };

    let identity = match resolve_identity(&*state, current.as_deref(), provider, &profile).await {
        Ok(identity) => identity,
        Err(e @ AppError::ProviderAuthFailed(_)) => {
            tracing::warn!(%provider, error = %e, "federated login rejected");
            return Ok(to_login());
        },
        Err(e) => return Err(e),
    };

    let token = state.resolver.login(current.as_deref(), &identity).await?;
    Ok(redirect_with_cookie(
        "/secrets",
        Some(state.session_cookie(&token)),
    ))
}

/// Link to the signed-in identity when there is one, else find-or-create.
/// An account already owned by someone else signs in as that owner.
async fn resolve_identity<S: CredentialStore + Clone + 'static>(
    state: &AppState<S>,
    current: Option<&str>,
    provider: Provider,
    profile: &ProviderProfile,
) -> Result<Identity, AppError> {
    let Some(signed_in) = state.resolver.current_identity(current).await? else {
        return state.linker.resolve(provider, profile).await;
    };
    match state.linker.link(signed_in.id, provider, profile).await {
        Ok(identity) => Ok(identity),
        Err(AppError::DuplicateKey { .. }) => state.linker.resolve(provider, profile).await,
        Err(e) => Err(e),
    }
}
