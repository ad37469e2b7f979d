//! Shared setup for the router-level tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use secrets_backend::{
    auth::{ProviderClient, ProviderRegistry},
    config::Settings,
    create_router,
    error::AppError,
    storage::{CredentialStore, FlatFileStorage},
    AppState,
};
use secrets_common::{
    Identity, IdentityId, IdentityUpdate, NewIdentity, Provider, ProviderProfile, SecretEntry,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const GOOD_CODE: &str = "good-code";

/// Settings pointing at `temp_dir`, with a cheap scrypt work factor
pub fn test_settings(temp_dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.data_dir = temp_dir.path().to_path_buf();
    settings.session.secret = SECRET.to_string();
    settings.password.log_n = 4;
    settings
}

pub struct TestApp<S = FlatFileStorage> {
    pub state: Arc<AppState<S>>,
    pub router: Router,
    pub storage: S,
    _temp_dir: TempDir,
}

/// App without federated providers
pub fn setup_test_env() -> TestApp {
    setup_with(ProviderRegistry::new(), |_| {})
}

/// App with fake Google and Facebook clients
pub fn setup_with_fake_providers() -> TestApp {
    let providers = ProviderRegistry::new()
        .with(Provider::Google, Arc::new(FakeProvider::new("google-account")))
        .with(Provider::Facebook, Arc::new(FakeProvider::new("facebook-account")));
    setup_with(providers, |_| {})
}

pub fn setup_with(providers: ProviderRegistry, tweak: impl FnOnce(&mut Settings)) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let storage = FlatFileStorage::new(temp_dir.path()).unwrap();
    let mut settings = test_settings(&temp_dir);
    tweak(&mut settings);

    let state = Arc::new(AppState::with_providers(storage.clone(), settings, providers).unwrap());
    let router = create_router(state.clone());
    TestApp {
        state,
        router,
        storage,
        _temp_dir: temp_dir,
    }
}

/// App whose store is down for every call
pub fn setup_with_failing_storage() -> TestApp<FailingStorage> {
    let temp_dir = TempDir::new().unwrap();
    let settings = test_settings(&temp_dir);
    let state = Arc::new(
        AppState::with_providers(FailingStorage, settings, ProviderRegistry::new()).unwrap(),
    );
    let router = create_router(state.clone());
    TestApp {
        state,
        router,
        storage: FailingStorage,
        _temp_dir: temp_dir,
    }
}

/// Store that answers every call with `StorageUnavailable`
#[derive(Clone)]
pub struct FailingStorage;

fn unavailable<T>() -> Result<T, AppError> {
    Err(AppError::StorageUnavailable("disk offline".to_string()))
}

#[async_trait]
impl CredentialStore for FailingStorage {
    async fn create(&self, _fields: NewIdentity) -> Result<Identity, AppError> {
        unavailable()
    }

    async fn find_by_id(&self, _id: IdentityId) -> Result<Identity, AppError> {
        unavailable()
    }

    async fn find_by_login_key(&self, _key: &str) -> Result<Identity, AppError> {
        unavailable()
    }

    async fn find_by_provider_id(
        &self,
        _provider: Provider,
        _provider_id: &str,
    ) -> Result<Identity, AppError> {
        unavailable()
    }

    async fn find_or_create_by_provider_id(
        &self,
        _provider: Provider,
        _provider_id: &str,
        _defaults: &ProviderProfile,
    ) -> Result<(Identity, bool), AppError> {
        unavailable()
    }

    async fn update_secret(&self, _id: IdentityId, _text: &str) -> Result<Identity, AppError> {
        unavailable()
    }

    async fn update(
        &self,
        _id: IdentityId,
        _fields: IdentityUpdate,
    ) -> Result<Identity, AppError> {
        unavailable()
    }

    async fn list_secrets(&self) -> Result<Vec<SecretEntry>, AppError> {
        unavailable()
    }

    async fn count(&self) -> Result<usize, AppError> {
        unavailable()
    }
}

/// Stand-in for a provider: accepts only [`GOOD_CODE`] and reports a fixed
/// account id
pub struct FakeProvider {
    account_id: String,
}

impl FakeProvider {
    pub fn new(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
        }
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    fn authorize_url(&self, state: &str) -> String {
        format!("https://provider.test/authorize?client_id=fake&state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AppError> {
        if code != GOOD_CODE {
            return Err(AppError::ProviderAuthFailed("bad code".to_string()));
        }
        Ok(ProviderProfile {
            id: self.account_id.clone(),
            email: Some("alice@example.com".to_string()),
            name: Some("Alice".to_string()),
        })
    }
}

impl<S> TestApp<S> {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Register and return the session cookie
    pub async fn register(&self, username: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/register",
                &format!("username={username}&password={password}"),
                None,
            )
            .await;
        assert_redirect(&response, "/secrets");
        session_cookie(&response).expect("registration sets a session cookie")
    }

    /// Log in and return the response
    pub async fn login(&self, username: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/login",
            &format!("username={username}&password={password}"),
            None,
        )
        .await
    }
}

/// `name=value` part of the response's session `Set-Cookie`, if any
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("secrets_session=") && pair.len() > "secrets_session=".len())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), to);
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
