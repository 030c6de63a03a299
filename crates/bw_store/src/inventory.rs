//! Book catalog operations.

use sqlx::Row;

use crate::error::StoreError;
use crate::models::{Book, RemovedBook};
use crate::vault::Workspace;

/// Column to sort a listing by. Whitelisted so user input can never reach the
/// ORDER BY clause as raw SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookColumn {
    BookId,
    Title,
    Author,
    Year,
    Genre,
    Status,
    Shelf,
}

impl BookColumn {
    fn as_sql(self) -> &'static str {
        match self {
            BookColumn::BookId => "book_id",
            BookColumn::Title => "title",
            BookColumn::Author => "author",
            BookColumn::Year => "year",
            BookColumn::Genre => "genre",
            BookColumn::Status => "status",
            BookColumn::Shelf => "shelf",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Exact catalog id match.
    pub book_id: Option<i64>,
    /// Case-insensitive substring match against title.
    pub title: Option<String>,
    /// Case-insensitive substring match against author.
    pub author: Option<String>,
    /// Exact year match.
    pub year: Option<String>,
    pub sort: Option<(BookColumn, SortOrder)>,
}

/// Per-book input for add/edit. Title is required; everything else defaults.
#[derive(Debug, Clone, Default)]
pub struct BookFields {
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub year: String,
    pub genre: String,
    pub status: String,
    pub shelf: String,
}

fn validate(fields: &BookFields) -> Result<(), StoreError> {
    if fields.book_id < 0 {
        return Err(StoreError::InvalidBookId(fields.book_id));
    }
    if fields.title.trim().is_empty() {
        return Err(StoreError::EmptyField("title"));
    }
    Ok(())
}

/// Insert a new book. A non-zero `book_id` must be unique; 0 may repeat.
pub async fn add_book(ws: &Workspace, fields: &BookFields) -> Result<(), StoreError> {
    validate(fields)?;
    if fields.book_id != 0 {
        let taken: Option<i64> =
            sqlx::query_scalar("SELECT book_id FROM books WHERE book_id = ? LIMIT 1")
                .bind(fields.book_id)
                .fetch_optional(ws.pool())
                .await?;
        if taken.is_some() {
            return Err(StoreError::DuplicateBookId(fields.book_id));
        }
    }

    let status = if fields.status.trim().is_empty() {
        "available"
    } else {
        fields.status.as_str()
    };
    sqlx::query(
        "INSERT INTO books (book_id, title, author, year, genre, status, shelf) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(fields.book_id)
    .bind(&fields.title)
    .bind(&fields.author)
    .bind(&fields.year)
    .bind(&fields.genre)
    .bind(status)
    .bind(&fields.shelf)
    .execute(ws.pool())
    .await?;
    Ok(())
}

/// Rewrite the book currently carrying `current_id`. With duplicated sentinel
/// rows the first matching row (by rowid) is the one edited.
pub async fn edit_book(
    ws: &Workspace,
    current_id: i64,
    fields: &BookFields,
) -> Result<(), StoreError> {
    validate(fields)?;

    let rowid: i64 = sqlx::query_scalar("SELECT rowid FROM books WHERE book_id = ? LIMIT 1")
        .bind(current_id)
        .fetch_optional(ws.pool())
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("book id {current_id}")))?;

    if fields.book_id != 0 {
        let clash: Option<i64> = sqlx::query_scalar(
            "SELECT rowid FROM books WHERE book_id = ? AND rowid != ? LIMIT 1",
        )
        .bind(fields.book_id)
        .bind(rowid)
        .fetch_optional(ws.pool())
        .await?;
        if clash.is_some() {
            return Err(StoreError::DuplicateBookId(fields.book_id));
        }
    }

    sqlx::query(
        "UPDATE books SET book_id = ?, title = ?, author = ?, year = ?, genre = ?, \
         status = ?, shelf = ? WHERE rowid = ?",
    )
    .bind(fields.book_id)
    .bind(&fields.title)
    .bind(&fields.author)
    .bind(&fields.year)
    .bind(&fields.genre)
    .bind(&fields.status)
    .bind(&fields.shelf)
    .bind(rowid)
    .execute(ws.pool())
    .await?;
    Ok(())
}

/// Delete a book and archive its display fields in `removed_books`, in one
/// transaction. Re-removing the same catalog id replaces the archived row.
pub async fn remove_book(ws: &Workspace, book_id: i64) -> Result<RemovedBook, StoreError> {
    let mut tx = ws.pool().begin().await?;

    let row = sqlx::query(
        "SELECT rowid, book_id, title, author, year, genre, status \
         FROM books WHERE book_id = ? LIMIT 1",
    )
    .bind(book_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("book id {book_id}")))?;

    let rowid: i64 = row.try_get("rowid")?;
    let removed = RemovedBook {
        book_id: row.try_get("book_id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        year: row.try_get("year")?,
        genre: row.try_get("genre")?,
        status: row.try_get("status")?,
    };

    sqlx::query("DELETE FROM books WHERE rowid = ?")
        .bind(rowid)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT OR REPLACE INTO removed_books (book_id, title, author, year, genre, status) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(removed.book_id)
    .bind(&removed.title)
    .bind(&removed.author)
    .bind(&removed.year)
    .bind(&removed.genre)
    .bind(&removed.status)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(removed)
}

pub async fn find_book(ws: &Workspace, book_id: i64) -> Result<Book, StoreError> {
    sqlx::query_as::<_, Book>(
        "SELECT book_id, title, author, year, genre, status, shelf \
         FROM books WHERE book_id = ? LIMIT 1",
    )
    .bind(book_id)
    .fetch_optional(ws.pool())
    .await?
    .ok_or_else(|| StoreError::NotFound(format!("book id {book_id}")))
}

pub async fn list_books(ws: &Workspace, filter: &BookFilter) -> Result<Vec<Book>, StoreError> {
    let mut sql = String::from(
        "SELECT book_id, title, author, year, genre, status, shelf FROM books WHERE 1 = 1",
    );
    if filter.book_id.is_some() {
        sql.push_str(" AND book_id = ?");
    }
    if filter.title.is_some() {
        sql.push_str(" AND title LIKE ?");
    }
    if filter.author.is_some() {
        sql.push_str(" AND author LIKE ?");
    }
    if filter.year.is_some() {
        sql.push_str(" AND year = ?");
    }
    if let Some((col, order)) = filter.sort {
        sql.push_str(" ORDER BY ");
        sql.push_str(col.as_sql());
        sql.push_str(match order {
            SortOrder::Ascending => " ASC",
            SortOrder::Descending => " DESC",
        });
    }

    let mut query = sqlx::query_as::<_, Book>(&sql);
    if let Some(id) = filter.book_id {
        query = query.bind(id);
    }
    if let Some(title) = &filter.title {
        query = query.bind(format!("%{title}%"));
    }
    if let Some(author) = &filter.author {
        query = query.bind(format!("%{author}%"));
    }
    if let Some(year) = &filter.year {
        query = query.bind(year);
    }
    Ok(query.fetch_all(ws.pool()).await?)
}

pub async fn list_removed_books(ws: &Workspace) -> Result<Vec<RemovedBook>, StoreError> {
    Ok(sqlx::query_as::<_, RemovedBook>(
        "SELECT book_id, title, author, year, genre, status FROM removed_books",
    )
    .fetch_all(ws.pool())
    .await?)
}

/// Derived loan state: true when any open loan references the catalog id.
pub async fn book_on_loan(ws: &Workspace, book_id: i64) -> Result<bool, StoreError> {
    let n: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM loans WHERE book_id = ? AND status = 'borrowed'",
    )
    .bind(book_id)
    .fetch_one(ws.pool())
    .await?;
    Ok(n > 0)
}
