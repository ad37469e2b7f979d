// ============================
// crates/backend-lib/src/middleware/gate.rs
// ============================
//! Access gate for protected routes.
use crate::storage::CredentialStore;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Let the request through only if its session is bound to an identity.
///
/// The resolved [`secrets_common::Identity`] is placed in the request
/// extensions for the handler. Anonymous callers are sent to `/login` and
/// the original request is not replayed afterwards.
pub async fn require_identity<S: CredentialStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = state.session_token(request.headers());
    match state.resolver.current_identity(token.as_deref()).await {
        Ok(Some(identity)) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        },
        Ok(None) => {
            tracing::debug!(path = %request.uri().path(), "anonymous request redirected to login");
            Redirect::to("/login").into_response()
        },
        // Never fall through to the protected handler
        Err(e) => e.into_response(),
    }
}
