use thiserror::Error;

/// Errors raised while talking to the identity provider.
#[derive(Error, Debug)]
pub enum KeycloakError {
    #[error("Malformed permission string: {0:?}")]
    MalformedPermission(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Identity provider returned {status} for {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// A refresh attempt was rejected; the session must log in again.
    #[error("Token expired or revoked")]
    TokenExpired,

    /// The caller's own access token was refused by the provider.
    #[error("Caller token rejected: {0}")]
    CallerRejected(String),

    /// The provider does not know a resource named in a permission request.
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Failed to decode provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Representation has no id: {0}")]
    MissingId(String),

    #[error("UMA2 discovery failed: {0}")]
    Discovery(String),
}

impl KeycloakError {
    /// Returns the HTTP status the provider answered with, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type KeycloakResult<T> = std::result::Result<T, KeycloakError>;
