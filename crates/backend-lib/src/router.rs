// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use crate::handlers::{auth, federated, pages, secrets};
use crate::middleware::require_identity;
use crate::storage::CredentialStore;
use crate::AppState;
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the application router
pub fn create_router<S: CredentialStore + Clone + 'static>(state: Arc<AppState<S>>) -> Router {
    let protected = Router::new()
        .route("/secrets", get(secrets::list_secrets::<S>))
        .route(
            "/submit",
            get(pages::submit_page).post(secrets::submit::<S>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_identity::<S>,
        ));

    Router::new()
        .route("/", get(pages::home::<S>))
        .route("/login", get(pages::login_page).post(auth::login::<S>))
        .route(
            "/register",
            get(pages::register_page).post(auth::register::<S>),
        )
        .route("/logout", get(auth::logout::<S>))
        .route("/auth/{provider}", get(federated::begin::<S>))
        .route("/auth/{provider}/secrets", get(federated::callback::<S>))
        .route("/health", get(pages::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
