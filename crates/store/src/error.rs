use thiserror::Error;

/// SQLSTATE codes reported as [`StoreError::Conflict`].
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness, check or foreign-key constraint rejected the write.
    #[error("Constraint violation: {constraint}")]
    Conflict { constraint: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be mapped back to a model.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// The store could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true if this error is a constraint violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && let Some(code) = db_err.code()
            && matches!(
                code.as_ref(),
                UNIQUE_VIOLATION | CHECK_VIOLATION | FOREIGN_KEY_VIOLATION
            )
        {
            return StoreError::Conflict {
                constraint: db_err.constraint().unwrap_or("unknown").to_string(),
            };
        }
        StoreError::Database(err)
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
