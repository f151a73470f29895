use salvo::http::StatusCode;
use salvo::writing::Json;
use serde::Serialize;
use thiserror::Error;

use catalog_keycloak::KeycloakError;
use catalog_service::error::ServiceError;

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] ServiceError),

    #[error(transparent)]
    KeycloakError(#[from] KeycloakError),

    #[error(transparent)]
    DatabaseError(#[from] catalog_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] catalog_core::error::CoreError),

    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn keycloak_status(err: &KeycloakError) -> StatusCode {
    match err {
        KeycloakError::MalformedPermission(_) => StatusCode::BAD_REQUEST,
        KeycloakError::TokenExpired | KeycloakError::CallerRejected(_) => {
            StatusCode::UNAUTHORIZED
        }
        KeycloakError::InvalidResource(_) => StatusCode::NOT_FOUND,
        KeycloakError::Transport(_)
        | KeycloakError::Http { .. }
        | KeycloakError::Decode(_)
        | KeycloakError::MissingId(_)
        | KeycloakError::Discovery(_) => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServiceError(err) => match err {
                ServiceError::KeycloakError(e) => keycloak_status(e),
                ServiceError::PolicyNotDeclared(_) => StatusCode::METHOD_NOT_ALLOWED,
                ServiceError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                ServiceError::NoSuchRemoteResource(_) | ServiceError::NotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
                ServiceError::DatabaseError(_) | ServiceError::CoreError(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::KeycloakError(e) => keycloak_status(e),
            Self::DatabaseError(_) | Self::CoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Writes this error as a JSON error response.
    pub fn render(&self, res: &mut salvo::Response) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }
        // Internal details stay in the log.
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        res.status_code(status);
        res.render(Json(ErrorResponse { error }));
    }
}
