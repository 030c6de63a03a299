//! Lending records.
//!
//! A loan moves along exactly one of two paths: borrowed -> returned or
//! borrowed -> lost. Terminal loans are immutable; every state is kept for
//! history.

use chrono::Utc;

use crate::error::StoreError;
use crate::models::{Loan, LoanStatus};
use crate::vault::Workspace;

/// Open a loan of `book_id` to `reader_id`. Both must exist; the same copy
/// may appear in several open loans (the catalog does not track copies).
pub async fn assign_book(
    ws: &Workspace,
    book_id: i64,
    reader_id: i64,
) -> Result<i64, StoreError> {
    let book_exists: Option<i64> =
        sqlx::query_scalar("SELECT book_id FROM books WHERE book_id = ? LIMIT 1")
            .bind(book_id)
            .fetch_optional(ws.pool())
            .await?;
    if book_exists.is_none() {
        return Err(StoreError::NotFound(format!("book id {book_id}")));
    }
    let reader_exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM readers WHERE id = ?")
            .bind(reader_id)
            .fetch_optional(ws.pool())
            .await?;
    if reader_exists.is_none() {
        return Err(StoreError::NotFound(format!("reader id {reader_id}")));
    }

    let res = sqlx::query(
        "INSERT INTO loans (book_id, reader_id, borrow_date, status) VALUES (?, ?, ?, ?)",
    )
    .bind(book_id)
    .bind(reader_id)
    .bind(Utc::now())
    .bind(LoanStatus::Borrowed)
    .execute(ws.pool())
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn mark_returned(ws: &Workspace, loan_id: i64) -> Result<(), StoreError> {
    close_loan(ws, loan_id, LoanStatus::Returned).await
}

pub async fn mark_lost(ws: &Workspace, loan_id: i64) -> Result<(), StoreError> {
    close_loan(ws, loan_id, LoanStatus::Lost).await
}

async fn close_loan(ws: &Workspace, loan_id: i64, to: LoanStatus) -> Result<(), StoreError> {
    let loan = find_loan(ws, loan_id).await?;
    if loan.status.is_terminal() {
        return Err(StoreError::LoanClosed(loan_id));
    }
    sqlx::query("UPDATE loans SET status = ?, return_date = ? WHERE id = ?")
        .bind(to)
        .bind(Utc::now())
        .bind(loan_id)
        .execute(ws.pool())
        .await?;
    Ok(())
}

pub async fn find_loan(ws: &Workspace, loan_id: i64) -> Result<Loan, StoreError> {
    sqlx::query_as::<_, Loan>(
        "SELECT id, book_id, reader_id, borrow_date, return_date, status \
         FROM loans WHERE id = ?",
    )
    .bind(loan_id)
    .fetch_optional(ws.pool())
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("loan id {loan_id}")))
}

/// All loans, newest first.
pub async fn list_loans(ws: &Workspace) -> Result<Vec<Loan>, StoreError> {
    Ok(sqlx::query_as::<_, Loan>(
        "SELECT id, book_id, reader_id, borrow_date, return_date, status \
         FROM loans ORDER BY id DESC",
    )
    .fetch_all(ws.pool())
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{add_book, BookFields};
    use crate::readers::add_reader;
    use crate::vault;
    use bw_crypto::kdf::vault_key_from_credentials;
    use tempfile::tempdir;

    async fn open_store(dir: &std::path::Path) -> Workspace {
        let key = vault_key_from_credentials("t", "t");
        vault::open(&dir.join("b.db.enc"), &dir.join("b.db"), key)
            .await
            .unwrap()
    }

    async fn seed(ws: &Workspace) -> i64 {
        add_book(
            ws,
            &BookFields {
                book_id: 1,
                title: "Dune".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        add_reader(ws, "Anna", "Kowalska", "3a").await.unwrap()
    }

    #[tokio::test]
    async fn assign_requires_existing_parties() {
        let dir = tempdir().unwrap();
        let ws = open_store(dir.path()).await;
        let reader = seed(&ws).await;

        assert!(matches!(
            assign_book(&ws, 99, reader).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            assign_book(&ws, 1, 99).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assign_book(&ws, 1, reader).await.unwrap();
        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn loan_transitions_are_one_way() {
        let dir = tempdir().unwrap();
        let ws = open_store(dir.path()).await;
        let reader = seed(&ws).await;

        let loan = assign_book(&ws, 1, reader).await.unwrap();
        mark_returned(&ws, loan).await.unwrap();

        let l = find_loan(&ws, loan).await.unwrap();
        assert_eq!(l.status, LoanStatus::Returned);
        assert!(l.return_date.is_some());

        assert!(matches!(
            mark_lost(&ws, loan).await.unwrap_err(),
            StoreError::LoanClosed(_)
        ));
        assert!(matches!(
            mark_returned(&ws, loan).await.unwrap_err(),
            StoreError::LoanClosed(_)
        ));
        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn lost_is_terminal_too() {
        let dir = tempdir().unwrap();
        let ws = open_store(dir.path()).await;
        let reader = seed(&ws).await;

        let loan = assign_book(&ws, 1, reader).await.unwrap();
        mark_lost(&ws, loan).await.unwrap();
        assert!(matches!(
            mark_returned(&ws, loan).await.unwrap_err(),
            StoreError::LoanClosed(_)
        ));
        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let dir = tempdir().unwrap();
        let ws = open_store(dir.path()).await;
        let reader = seed(&ws).await;

        let first = assign_book(&ws, 1, reader).await.unwrap();
        let second = assign_book(&ws, 1, reader).await.unwrap();
        let all = list_loans(&ws).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second);
        assert_eq!(all[1].id, first);
        ws.persist().await.unwrap();
    }
}
