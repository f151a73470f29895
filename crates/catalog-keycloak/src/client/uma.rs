use std::sync::Arc;

use async_trait::async_trait;

use super::{KeycloakConnection, ServiceAccountToken, ensure_success, read_json};
use crate::api::ResourceRegistry;
use crate::error::{KeycloakError, KeycloakResult};
use crate::model::{Uma2Resource, UmaPolicy};

/// Upper bound on policies fetched for one resource.
const POLICY_PAGE: &str = "1000";

/// UMA2 protection API client (resource set registration and UMA policies).
pub struct UmaClient {
    conn: Arc<KeycloakConnection>,
    token: Arc<ServiceAccountToken>,
}

impl UmaClient {
    #[must_use]
    pub fn new(conn: Arc<KeycloakConnection>, token: Arc<ServiceAccountToken>) -> Self {
        Self { conn, token }
    }
}

#[async_trait]
impl ResourceRegistry for UmaClient {
    #[tracing::instrument(skip(self))]
    async fn find_resource(&self, name: &str) -> KeycloakResult<Option<Uma2Resource>> {
        let uma2 = self.conn.uma2_configuration().await?;
        let token = self.token.access_token().await?;
        let response = self
            .conn
            .http()
            .get(&uma2.resource_registration_endpoint)
            .bearer_auth(token)
            .query(&[("name", name), ("exactName", "true"), ("deep", "true")])
            .send()
            .await?;
        let resources: Vec<Uma2Resource> = read_json(ensure_success(response).await?).await?;
        Ok(resources.into_iter().find(|r| r.name == name))
    }

    #[tracing::instrument(skip(self, resource), fields(name = %resource.name))]
    async fn create_resource(&self, resource: &Uma2Resource) -> KeycloakResult<Uma2Resource> {
        let uma2 = self.conn.uma2_configuration().await?;
        let token = self.token.access_token().await?;
        let response = self
            .conn
            .http()
            .post(&uma2.resource_registration_endpoint)
            .bearer_auth(token)
            .json(resource)
            .send()
            .await?;
        let created: Uma2Resource = read_json(ensure_success(response).await?).await?;
        tracing::info!(id = ?created.id, name = %created.name, "Registered UMA2 resource");
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_resource(&self, resource_id: &str) -> KeycloakResult<()> {
        let uma2 = self.conn.uma2_configuration().await?;
        let token = self.token.access_token().await?;
        let url = format!("{}/{resource_id}", uma2.resource_registration_endpoint);
        let response = self
            .conn
            .http()
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn find_policies(
        &self,
        resource_id: &str,
        name: Option<&str>,
    ) -> KeycloakResult<Vec<UmaPolicy>> {
        let uma2 = self.conn.uma2_configuration().await?;
        let token = self.token.access_token().await?;
        let mut query = vec![("resource", resource_id), ("first", "0"), ("max", POLICY_PAGE)];
        if let Some(name) = name {
            query.push(("name", name));
        }
        let response = self
            .conn
            .http()
            .get(&uma2.policy_endpoint)
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;
        let policies: Vec<UmaPolicy> = read_json(ensure_success(response).await?).await?;
        // The provider matches `name` as a substring.
        Ok(match name {
            Some(name) => policies.into_iter().filter(|p| p.name == name).collect(),
            None => policies,
        })
    }

    #[tracing::instrument(skip(self, policy), fields(policy = %policy.name))]
    async fn create_policy(
        &self,
        resource_id: &str,
        policy: &UmaPolicy,
    ) -> KeycloakResult<UmaPolicy> {
        let uma2 = self.conn.uma2_configuration().await?;
        let token = self.token.access_token().await?;
        let url = format!("{}/{resource_id}", uma2.policy_endpoint);
        let response = self
            .conn
            .http()
            .post(&url)
            .bearer_auth(token)
            .json(policy)
            .send()
            .await?;
        read_json(ensure_success(response).await?).await
    }

    #[tracing::instrument(skip(self, policy), fields(policy = %policy.name))]
    async fn update_policy(&self, policy: &UmaPolicy) -> KeycloakResult<()> {
        let Some(policy_id) = policy.id.as_deref() else {
            return Err(KeycloakError::MissingId(policy.name.clone()));
        };
        let uma2 = self.conn.uma2_configuration().await?;
        let token = self.token.access_token().await?;
        let url = format!("{}/{policy_id}", uma2.policy_endpoint);
        let response = self
            .conn
            .http()
            .put(&url)
            .bearer_auth(token)
            .json(policy)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_policy(&self, policy_id: &str) -> KeycloakResult<()> {
        let uma2 = self.conn.uma2_configuration().await?;
        let token = self.token.access_token().await?;
        let url = format!("{}/{policy_id}", uma2.policy_endpoint);
        let response = self
            .conn
            .http()
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
