use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::{KeycloakConnection, ensure_success, read_json};
use crate::error::{KeycloakError, KeycloakResult};
use crate::model::TokenSet;

/// Tokens are renewed this long before the provider would reject them.
const EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Token endpoint grants on behalf of the configured client.
#[derive(Debug, Clone)]
pub struct OpenIdClient {
    conn: Arc<KeycloakConnection>,
}

impl OpenIdClient {
    #[must_use]
    pub fn new(conn: Arc<KeycloakConnection>) -> Self {
        Self { conn }
    }

    /// ## Summary
    /// Obtains a service-account token with the client credentials grant.
    ///
    /// ## Errors
    /// Returns a provider error if discovery or the grant fails.
    #[tracing::instrument(skip(self), fields(client_id = %self.conn.client_id()))]
    pub async fn client_credentials(&self) -> KeycloakResult<TokenSet> {
        let uma2 = self.conn.uma2_configuration().await?;
        let response = self
            .conn
            .http()
            .post(&uma2.token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.conn.client_id()),
                ("client_secret", self.conn.client_secret()),
            ])
            .send()
            .await?;
        read_json(ensure_success(response).await?).await
    }

    /// ## Summary
    /// Exchanges a refresh token for a new token set.
    ///
    /// ## Errors
    /// Returns `TokenExpired` if the provider rejects the refresh token with a
    /// 4xx status, or another provider error for transport/server failures.
    #[tracing::instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> KeycloakResult<TokenSet> {
        let uma2 = self.conn.uma2_configuration().await?;
        let response = self
            .conn
            .http()
            .post(&uma2.token_endpoint)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.conn.client_id()),
                ("client_secret", self.conn.client_secret()),
            ])
            .send()
            .await?;

        if response.status().is_client_error() {
            tracing::debug!(status = %response.status(), "Refresh token rejected");
            return Err(KeycloakError::TokenExpired);
        }
        read_json(ensure_success(response).await?).await
    }
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
    refresh_token: Option<String>,
    refresh_expires_at: Option<Instant>,
}

impl CachedToken {
    fn from_set(set: TokenSet, now: Instant) -> Self {
        // A lifetime past the clock's range counts as already expired.
        let deadline = |secs: u64| now.checked_add(Duration::from_secs(secs)).unwrap_or(now);
        Self {
            access_token: set.access_token,
            expires_at: deadline(set.expires_in),
            refresh_expires_at: set.refresh_expires_in.map(deadline),
            refresh_token: set.refresh_token,
        }
    }

    fn access_valid(&self, now: Instant) -> bool {
        now + EXPIRY_SKEW < self.expires_at
    }

    fn usable_refresh(&self, now: Instant) -> Option<&str> {
        let valid = self
            .refresh_expires_at
            .is_none_or(|at| now + EXPIRY_SKEW < at);
        self.refresh_token.as_deref().filter(|_| valid)
    }
}

/// Cached service-account token for the Admin and UMA2 capabilities.
pub struct ServiceAccountToken {
    openid: OpenIdClient,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountToken {
    #[must_use]
    pub fn new(conn: Arc<KeycloakConnection>) -> Self {
        Self {
            openid: OpenIdClient::new(conn),
            cached: Mutex::new(None),
        }
    }

    /// ## Summary
    /// Returns a usable access token, renewing it when close to expiry.
    /// A rejected refresh falls back to a fresh client credentials grant,
    /// since a service account can always log in again.
    ///
    /// ## Errors
    /// Returns a provider error if a new token cannot be obtained.
    pub async fn access_token(&self) -> KeycloakResult<String> {
        let mut cached = self.cached.lock().await;
        let now = Instant::now();

        if let Some(token) = cached.as_ref() {
            if token.access_valid(now) {
                return Ok(token.access_token.clone());
            }
        }

        let refresh = cached
            .as_ref()
            .and_then(|t| t.usable_refresh(now))
            .map(str::to_string);

        let set = match refresh {
            Some(refresh_token) => match self.openid.refresh(&refresh_token).await {
                Ok(set) => set,
                Err(KeycloakError::TokenExpired) => {
                    tracing::debug!("Service account refresh token expired, logging in again");
                    self.openid.client_credentials().await?
                }
                Err(e) => return Err(e),
            },
            None => self.openid.client_credentials().await?,
        };

        tracing::debug!(expires_in = set.expires_in, "Service account token renewed");
        let token = CachedToken::from_set(set, now);
        let access = token.access_token.clone();
        *cached = Some(token);
        Ok(access)
    }
}
