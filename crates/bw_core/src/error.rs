use bw_store::StoreError;
use thiserror::Error;

/// The error surface exposed to callers (UI, tooling). Every variant maps to
/// a localized message via [`crate::lang::error_message`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Too many failed attempts; locked out for {remaining_secs} more seconds")]
    LockedOut { remaining_secs: u64 },

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Storage failure: {0}")]
    StorageFailure(StoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BadKey => CoreError::AuthenticationFailed,
            StoreError::DuplicateBookId(id) => CoreError::DuplicateKey(format!("book id {id}")),
            StoreError::DuplicateUsername(name) => {
                CoreError::DuplicateKey(format!("username {name}"))
            }
            StoreError::NotFound(what) => CoreError::NotFound(what),
            StoreError::EmptyField(field) => {
                CoreError::InvalidInput(format!("{field} must not be empty"))
            }
            StoreError::InvalidBookId(id) => {
                CoreError::InvalidInput(format!("book id {id} must be >= 0"))
            }
            StoreError::LoanClosed(id) => {
                CoreError::InvalidInput(format!("loan {id} is already closed"))
            }
            other => CoreError::StorageFailure(other),
        }
    }
}
