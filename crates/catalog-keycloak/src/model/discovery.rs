use catalog_core::config::ManualUma2Config;
use serde::{Deserialize, Serialize};

/// The realm's `.well-known/uma2-configuration` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uma2Configuration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub introspection_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
    pub registration_endpoint: String,
    pub resource_registration_endpoint: String,
    pub permission_endpoint: String,
    pub policy_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
}

impl From<ManualUma2Config> for Uma2Configuration {
    fn from(manual: ManualUma2Config) -> Self {
        Self {
            issuer: manual.issuer,
            authorization_endpoint: manual.authorization_endpoint,
            token_endpoint: manual.token_endpoint,
            introspection_endpoint: manual.introspection_endpoint,
            end_session_endpoint: manual.end_session_endpoint,
            registration_endpoint: manual.registration_endpoint,
            resource_registration_endpoint: manual.resource_registration_endpoint,
            permission_endpoint: manual.permission_endpoint,
            policy_endpoint: manual.policy_endpoint,
            jwks_uri: manual.jwks_uri,
        }
    }
}
