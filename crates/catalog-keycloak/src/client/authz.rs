use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{KeycloakConnection, ensure_success, provider_error, read_json};
use crate::api::PermissionAuthority;
use crate::error::{KeycloakError, KeycloakResult};
use crate::model::GrantedPermission;
use crate::model::token::Decision;
use crate::permission::AuthzPermission;

const UMA_TICKET_GRANT: &str = "urn:ietf:params:oauth:grant-type:uma-ticket";

/// Authorization API client acting with the caller's own access token.
pub struct AuthzClient {
    conn: Arc<KeycloakConnection>,
    bearer: String,
}

impl std::fmt::Debug for AuthzClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthzClient")
            .field("conn", &self.conn)
            .finish_non_exhaustive()
    }
}

impl AuthzClient {
    #[must_use]
    pub fn new(conn: Arc<KeycloakConnection>, bearer: impl Into<String>) -> Self {
        Self {
            conn,
            bearer: bearer.into(),
        }
    }

    /// Sends a uma-ticket grant. `Ok(None)` means the provider denied it.
    async fn ticket_grant(
        &self,
        permissions: &[&AuthzPermission],
        response_mode: &str,
    ) -> KeycloakResult<Option<reqwest::Response>> {
        let uma2 = self.conn.uma2_configuration().await?;

        let mut form = vec![
            ("grant_type", UMA_TICKET_GRANT.to_string()),
            ("audience", self.conn.client_id().to_string()),
            ("response_mode", response_mode.to_string()),
        ];
        form.extend(permissions.iter().map(|p| ("permission", p.to_string())));

        let response = self
            .conn
            .http()
            .post(&uma2.token_endpoint)
            .bearer_auth(&self.bearer)
            .form(&form)
            .send()
            .await?;

        match response.status() {
            StatusCode::FORBIDDEN => Ok(None),
            StatusCode::UNAUTHORIZED => {
                let body = response.text().await.unwrap_or_default();
                let parsed = provider_error(&body);
                Err(KeycloakError::CallerRejected(
                    parsed.error_description.unwrap_or(parsed.error),
                ))
            }
            StatusCode::BAD_REQUEST => {
                let url = response.url().to_string();
                let body = response.text().await.unwrap_or_default();
                let parsed = provider_error(&body);
                if parsed.error == "invalid_resource" {
                    return Err(KeycloakError::InvalidResource(
                        parsed.error_description.unwrap_or(body),
                    ));
                }
                Err(KeycloakError::Http {
                    status: StatusCode::BAD_REQUEST.as_u16(),
                    url,
                    body,
                })
            }
            _ => Ok(Some(ensure_success(response).await?)),
        }
    }
}

#[async_trait]
impl PermissionAuthority for AuthzClient {
    #[tracing::instrument(skip(self), fields(count = permissions.len()))]
    async fn check_permissions(&self, permissions: &[AuthzPermission]) -> KeycloakResult<bool> {
        if permissions.is_empty() {
            tracing::warn!("Permission check requested with no permissions, denying");
            return Ok(false);
        }
        let refs: Vec<&AuthzPermission> = permissions.iter().collect();
        match self.ticket_grant(&refs, "decision").await? {
            Some(response) => {
                let decision: Decision = read_json(response).await?;
                Ok(decision.result)
            }
            None => Ok(false),
        }
    }

    #[tracing::instrument(skip(self), fields(filter = %filter))]
    async fn get_permissions(
        &self,
        filter: &AuthzPermission,
    ) -> KeycloakResult<Vec<AuthzPermission>> {
        let Some(response) = self.ticket_grant(&[filter], "permissions").await? else {
            return Ok(Vec::new());
        };
        let granted: Vec<GrantedPermission> = read_json(response).await?;

        let mut permissions = Vec::new();
        for entry in granted {
            let Some(resource) = entry.rsname.or(entry.rsid) else {
                continue;
            };
            if entry.scopes.is_empty() {
                permissions.push(AuthzPermission::new(resource, String::new())?);
                continue;
            }
            for scope in entry.scopes {
                permissions.push(AuthzPermission::new(resource.clone(), scope)?);
            }
        }
        tracing::debug!(count = permissions.len(), "Permissions granted");
        Ok(permissions)
    }
}
