// ============================
// crates/backend-lib/src/auth/provider.rs
// ============================
//! OAuth provider clients.
//!
//! The handshake itself is delegated to the `oauth2` crate (authorization
//! code flow); this module only builds the redirect, exchanges the code and
//! fetches the account profile. Everything a provider can get wrong surfaces
//! as `ProviderAuthFailed`.

use crate::config::{OAuthProviderSettings, ProviderSettings};
use crate::error::AppError;
use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use secrets_common::{Provider, ProviderProfile};
use std::collections::HashMap;
use std::sync::Arc;

/// Hands the browser to a provider and turns its callback into a profile
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// URL the user is redirected to; `state` comes back on the callback
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange the callback's authorization code for the account profile
    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AppError>;
}

/// Built-in endpoints for a provider
struct ProviderEndpoints {
    auth_url: &'static str,
    token_url: &'static str,
    profile_url: &'static str,
    scopes: &'static [&'static str],
}

fn default_endpoints(provider: Provider) -> ProviderEndpoints {
    match provider {
        Provider::Google => ProviderEndpoints {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
            token_url: "https://oauth2.googleapis.com/token",
            profile_url: "https://www.googleapis.com/oauth2/v2/userinfo",
            scopes: &["openid", "email", "profile"],
        },
        Provider::Facebook => ProviderEndpoints {
            auth_url: "https://www.facebook.com/v19.0/dialog/oauth",
            token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
            profile_url: "https://graph.facebook.com/me?fields=id,name,email",
            scopes: &["email"],
        },
    }
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Authorization-code client for one provider
pub struct OAuthProviderClient {
    provider: Provider,
    client: ConfiguredClient,
    profile_url: String,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl OAuthProviderClient {
    pub fn new(provider: Provider, settings: &OAuthProviderSettings) -> anyhow::Result<Self> {
        let defaults = default_endpoints(provider);
        let auth_url = settings.auth_url.as_deref().unwrap_or(defaults.auth_url);
        let token_url = settings.token_url.as_deref().unwrap_or(defaults.token_url);

        let client = BasicClient::new(ClientId::new(settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(settings.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(auth_url.to_string())?)
            .set_token_uri(TokenUrl::new(token_url.to_string())?)
            .set_redirect_uri(RedirectUrl::new(settings.callback_url.clone())?)
            // Facebook only accepts client credentials in the request body
            .set_auth_type(AuthType::RequestBody);

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            provider,
            client,
            profile_url: settings
                .profile_url
                .clone()
                .unwrap_or_else(|| defaults.profile_url.to_string()),
            scopes: settings.scopes.clone().unwrap_or_else(|| {
                defaults.scopes.iter().map(|s| s.to_string()).collect()
            }),
            http,
        })
    }

    fn failed(&self, what: &str, err: impl std::fmt::Display) -> AppError {
        AppError::ProviderAuthFailed(format!("{}: {what}: {err}", self.provider))
    }
}

#[async_trait]
impl ProviderClient for OAuthProviderClient {
    fn authorize_url(&self, state: &str) -> String {
        let state = state.to_string();
        let (url, _csrf) = self
            .client
            .authorize_url(move || CsrfToken::new(state))
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .url();
        url.to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderProfile, AppError> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http)
            .await
            .map_err(|e| self.failed("token exchange", e))?;

        let response = self
            .http
            .get(&self.profile_url)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|e| self.failed("profile request", e))?;
        if !response.status().is_success() {
            return Err(self.failed("profile request", response.status()));
        }

        let profile: ProviderProfile = response
            .json()
            .await
            .map_err(|e| self.failed("profile decode", e))?;
        if profile.id.is_empty() {
            return Err(self.failed("profile decode", "empty account id"));
        }
        Ok(profile)
    }
}

/// Configured providers; unconfigured ones are simply absent
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    clients: HashMap<Provider, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build OAuth clients for every provider present in the settings
    pub fn from_settings(settings: &ProviderSettings) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        for provider in Provider::ALL {
            if let Some(provider_settings) = settings.get(provider) {
                let client = OAuthProviderClient::new(provider, provider_settings)?;
                registry = registry.with(provider, Arc::new(client));
                tracing::info!(%provider, "federated login enabled");
            }
        }
        Ok(registry)
    }

    pub fn with(mut self, provider: Provider, client: Arc<dyn ProviderClient>) -> Self {
        self.clients.insert(provider, client);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ProviderClient>> {
        self.clients.get(&provider).cloned()
    }
}
