use thiserror::Error;

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Mirror invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    CoreError(#[from] catalog_core::error::CoreError),
}

pub type DbResult<T> = std::result::Result<T, DbError>;
