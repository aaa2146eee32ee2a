use store::StoreError;
use thiserror::Error;

/// Errors raised while starting or stopping the process.
#[derive(Debug, Error)]
pub enum AppError {
    /// The pool could not connect to the database.
    #[error("Database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    /// A store operation failed during start-up, such as migrations.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, AppError>;
