use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    KeycloakError(#[from] catalog_keycloak::KeycloakError),

    #[error(transparent)]
    DatabaseError(#[from] catalog_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] catalog_core::error::CoreError),

    #[error("No access policy declared for action: {0}")]
    PolicyNotDeclared(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Remote resource not found: {0}")]
    NoSuchRemoteResource(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
