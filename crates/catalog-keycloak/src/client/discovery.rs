use std::sync::Arc;

use catalog_core::config::KeycloakConfig;
use tokio::sync::OnceCell;

use crate::error::{KeycloakError, KeycloakResult};
use crate::model::Uma2Configuration;

/// How clients obtain the realm's UMA2 endpoints.
///
/// One instance is shared by every client of a process, so discovery happens
/// at most once per process.
#[derive(Debug)]
pub enum Uma2ConfigSource {
    /// Fetch `.well-known/uma2-configuration` on first use and keep it.
    Discover(OnceCell<Arc<Uma2Configuration>>),
    /// Use statically supplied endpoints; never touches the network.
    Static(Arc<Uma2Configuration>),
}

impl Uma2ConfigSource {
    #[must_use]
    pub fn discover() -> Self {
        Self::Discover(OnceCell::new())
    }

    #[must_use]
    pub fn fixed(config: Uma2Configuration) -> Self {
        Self::Static(Arc::new(config))
    }

    /// ## Summary
    /// Picks the policy configured for this deployment.
    ///
    /// ## Errors
    /// Returns `Discovery` if discovery is disabled and no endpoints were supplied.
    pub fn from_config(config: &KeycloakConfig) -> KeycloakResult<Self> {
        if config.uma2_discovery {
            return Ok(Self::discover());
        }
        config
            .uma2_configuration
            .clone()
            .map(|manual| Self::fixed(manual.into()))
            .ok_or_else(|| {
                KeycloakError::Discovery(
                    "discovery disabled and no static UMA2 configuration supplied".to_string(),
                )
            })
    }

    /// ## Summary
    /// Returns the endpoints, fetching them on first use for `Discover`.
    /// A failed fetch is not cached; the next call tries again.
    ///
    /// ## Errors
    /// Returns a transport, HTTP or decode error from the discovery request.
    pub async fn resolve(
        &self,
        http: &reqwest::Client,
        realm_url: &str,
    ) -> KeycloakResult<Arc<Uma2Configuration>> {
        match self {
            Self::Static(config) => Ok(Arc::clone(config)),
            Self::Discover(cell) => cell
                .get_or_try_init(|| fetch(http, realm_url))
                .await
                .map(Arc::clone),
        }
    }
}

#[tracing::instrument(skip(http))]
async fn fetch(http: &reqwest::Client, realm_url: &str) -> KeycloakResult<Arc<Uma2Configuration>> {
    let url = format!("{realm_url}/.well-known/uma2-configuration");
    tracing::debug!(url = %url, "Fetching UMA2 configuration");

    let response = super::ensure_success(http.get(&url).send().await?).await?;
    let config: Uma2Configuration = super::read_json(response).await?;

    tracing::info!(issuer = %config.issuer, "UMA2 configuration discovered");
    Ok(Arc::new(config))
}
