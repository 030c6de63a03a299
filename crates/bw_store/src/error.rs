use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] bw_crypto::CryptoError),

    #[error("Vault key rejected (wrong credentials or corrupt store)")]
    BadKey,

    #[error("Store is already open in another session")]
    WorkspaceBusy,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate book id {0}")]
    DuplicateBookId(i64),

    #[error("Duplicate username {0}")]
    DuplicateUsername(String),

    #[error("Book id {0} is invalid (must be >= 0)")]
    InvalidBookId(i64),

    #[error("Required field is empty: {0}")]
    EmptyField(&'static str),

    #[error("Loan {0} is already closed")]
    LoanClosed(i64),

    #[error("Restore refused: the store is open in an active session")]
    RestoreWhileOpen,
}
