use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::{KeycloakConnection, ServiceAccountToken, ensure_success, read_json};
use crate::api::GroupDirectory;
use crate::error::KeycloakResult;
use crate::model::RemoteGroup;

const PAGE_SIZE: usize = 100;

/// Admin REST API client, authenticated as the service account.
pub struct AdminClient {
    conn: Arc<KeycloakConnection>,
    token: Arc<ServiceAccountToken>,
}

impl AdminClient {
    #[must_use]
    pub fn new(conn: Arc<KeycloakConnection>, token: Arc<ServiceAccountToken>) -> Self {
        Self { conn, token }
    }

    /// Fetches every page of a group listing endpoint.
    async fn fetch_all(&self, url: &str, brief: bool) -> KeycloakResult<Vec<RemoteGroup>> {
        let mut groups = Vec::new();
        let mut first = 0usize;
        loop {
            let token = self.token.access_token().await?;
            let response = self
                .conn
                .http()
                .get(url)
                .bearer_auth(token)
                .query(&[
                    ("briefRepresentation", brief.to_string()),
                    ("first", first.to_string()),
                    ("max", PAGE_SIZE.to_string()),
                ])
                .send()
                .await?;
            let page: Vec<RemoteGroup> = read_json(ensure_success(response).await?).await?;
            let len = page.len();
            groups.extend(page);
            if len < PAGE_SIZE {
                return Ok(groups);
            }
            first += len;
        }
    }

    /// Fills in children the server only reported by count.
    fn fill_children<'a>(
        &'a self,
        group: &'a mut RemoteGroup,
        brief: bool,
    ) -> Pin<Box<dyn Future<Output = KeycloakResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if group.has_unfetched_children() {
                let url = format!("{}/groups/{}/children", self.conn.admin_url(), group.id);
                tracing::trace!(group_id = %group.id, "Fetching lazily returned children");
                group.sub_groups = self.fetch_all(&url, brief).await?;
            }
            for child in &mut group.sub_groups {
                self.fill_children(child, brief).await?;
            }
            Ok(())
        })
    }
}

#[async_trait]
impl GroupDirectory for AdminClient {
    #[tracing::instrument(skip(self), fields(realm = %self.conn.realm()))]
    async fn list_groups(&self, brief: bool) -> KeycloakResult<Vec<RemoteGroup>> {
        let url = format!("{}/groups", self.conn.admin_url());
        let mut groups = self.fetch_all(&url, brief).await?;
        for group in &mut groups {
            self.fill_children(group, brief).await?;
        }
        tracing::debug!(root_groups = groups.len(), "Fetched remote group tree");
        Ok(groups)
    }
}
