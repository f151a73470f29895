//! reqwest-backed provider clients.
//!
//! All clients share one [`KeycloakConnection`]: server URL, realm, client
//! credentials, the HTTP client and the injected [`Uma2ConfigSource`].

mod admin;
mod authz;
mod discovery;
mod token;
mod uma;

use std::sync::Arc;
use std::time::Duration;

use catalog_core::config::KeycloakConfig;

use crate::error::{KeycloakError, KeycloakResult};
use crate::model::{ProviderErrorBody, Uma2Configuration};

pub use admin::AdminClient;
pub use authz::AuthzClient;
pub use discovery::Uma2ConfigSource;
pub use token::{OpenIdClient, ServiceAccountToken};
pub use uma::UmaClient;

/// Shared connection settings for every capability client.
pub struct KeycloakConnection {
    http: reqwest::Client,
    server_url: String,
    realm: String,
    client_id: String,
    client_secret: String,
    uma2: Arc<Uma2ConfigSource>,
}

impl std::fmt::Debug for KeycloakConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakConnection")
            .field("server_url", &self.server_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl KeycloakConnection {
    /// ## Summary
    /// Builds a connection from configuration.
    ///
    /// ## Errors
    /// Returns `Transport` if the HTTP client cannot be constructed.
    pub fn from_config(config: &KeycloakConfig, uma2: Arc<Uma2ConfigSource>) -> KeycloakResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::new(
            http,
            &config.url,
            &config.realm,
            &config.client_id,
            &config.client_secret,
            uma2,
        ))
    }

    #[must_use]
    pub fn new(
        http: reqwest::Client,
        server_url: &str,
        realm: &str,
        client_id: &str,
        client_secret: &str,
        uma2: Arc<Uma2ConfigSource>,
    ) -> Self {
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            realm: realm.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            uma2,
        }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// `{server}/realms/{realm}`
    #[must_use]
    pub fn realm_url(&self) -> String {
        format!("{}/realms/{}", self.server_url, self.realm)
    }

    /// `{server}/admin/realms/{realm}`
    #[must_use]
    pub fn admin_url(&self) -> String {
        format!("{}/admin/realms/{}", self.server_url, self.realm)
    }

    /// ## Summary
    /// Resolves the realm's UMA2 endpoints through the injected policy.
    ///
    /// ## Errors
    /// Returns `Discovery` or a transport error if the document cannot be fetched.
    pub async fn uma2_configuration(&self) -> KeycloakResult<Arc<Uma2Configuration>> {
        self.uma2.resolve(&self.http, &self.realm_url()).await
    }
}

/// Passes successful responses through and turns the rest into `Http` errors.
pub(crate) async fn ensure_success(response: reqwest::Response) -> KeycloakResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(KeycloakError::Http {
        status: status.as_u16(),
        url,
        body,
    })
}

/// Best-effort parse of an OAuth error body.
pub(crate) fn provider_error(body: &str) -> ProviderErrorBody {
    serde_json::from_str(body).unwrap_or_default()
}

/// Reads a JSON body, reporting shape mismatches as `Decode`.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> KeycloakResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
