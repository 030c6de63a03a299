//! Row models mapped to/from SQL rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An active catalog entry. `book_id` is the catalog number printed on the
/// copy, not a surrogate key: non-zero values are unique, the sentinel 0
/// ("uncatalogued") may repeat.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub year: String,
    pub genre: String,
    /// Display/workflow hint maintained by edit operations; NOT derived from
    /// the loans table. See `inventory::book_on_loan` for the derived view.
    pub status: String,
    pub shelf: String,
}

/// Archival shadow of a book at removal time (the six display fields).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RemovedBook {
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub year: String,
    pub genre: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Stored as the raw comparison secret; this is also the vault key input.
    pub password: String,
    pub is_admin: bool,
    pub is_superadmin: bool,
    /// Legacy comma-delimited capability tags ("db", "reader"). Parsed into a
    /// typed set by the access-control layer.
    pub privileges: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reader {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub grade: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Borrowed,
    Returned,
    Lost,
}

impl LoanStatus {
    /// `returned` and `lost` are terminal: no further transition exists.
    pub fn is_terminal(self) -> bool {
        !matches!(self, LoanStatus::Borrowed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "borrowed",
            LoanStatus::Returned => "returned",
            LoanStatus::Lost => "lost",
        }
    }
}

/// A lending record. Loans are kept forever for history; only `status` and
/// `return_date` ever change, and only along borrowed -> returned | lost.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Loan {
    pub id: i64,
    pub book_id: i64,
    pub reader_id: i64,
    pub borrow_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

/// One immutable audit row. `user_id` is null when the acting principal
/// could not be resolved.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub timestamp: DateTime<Utc>,
}
