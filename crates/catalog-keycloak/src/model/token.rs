use serde::Deserialize;

/// Token endpoint response.
#[derive(Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("refresh_expires_in", &self.refresh_expires_in)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

/// One entry of a `response_mode=permissions` answer.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantedPermission {
    #[serde(default)]
    pub rsid: Option<String>,
    #[serde(default)]
    pub rsname: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// `response_mode=decision` answer.
#[derive(Debug, Clone, Deserialize)]
pub struct Decision {
    pub result: bool,
}

/// OAuth error body (`{"error": ..., "error_description": ...}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
