// ============================
// crates/backend-lib/src/handlers/secrets.rs
// ============================
//! The shared secrets board. Both routes sit behind the access gate.
use crate::error::AppError;
use crate::metrics::SECRET_SUBMITTED;
use crate::storage::CredentialStore;
use crate::validation;
use crate::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use metrics::counter;
use secrets_common::{Identity, SecretListing, SecretSubmission};
use std::sync::Arc;

/// `GET /secrets`: every secret submitted so far, oldest first
pub async fn list_secrets<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(_identity): Extension<Identity>,
) -> Result<Json<SecretListing>, AppError> {
    let secrets = state.storage.list_secrets().await?;
    Ok(Json(SecretListing { secrets }))
}

/// `POST /submit`: set the caller's secret
pub async fn submit<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Extension(identity): Extension<Identity>,
    Form(submission): Form<SecretSubmission>,
) -> Result<Response, AppError> {
    let secret = match validation::validate_secret(&submission.secret) {
        Ok(secret) => secret,
        Err(e) => {
            tracing::warn!(id = %identity.id, error = %e, "secret rejected");
            return Ok(Redirect::to("/submit").into_response());
        },
    };

    state.storage.update_secret(identity.id, secret).await?;
    counter!(SECRET_SUBMITTED).increment(1);
    tracing::info!(id = %identity.id, "secret submitted");
    Ok(Redirect::to("/secrets").into_response())
}
