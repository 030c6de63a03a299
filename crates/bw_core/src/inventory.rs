//! Session-level inventory and lending operations. Thin capability-checked
//! wrappers over the store, adding the audit entries the store does not own.

use bw_store::inventory::{self, BookFields, BookFilter};
use bw_store::models::{Book, Loan, Reader, RemovedBook};
use bw_store::{audit, loans, readers};

use crate::access::Capability;
use crate::error::CoreError;
use crate::session::SessionManager;

impl SessionManager {
    pub async fn add_book(&self, fields: &BookFields) -> Result<(), CoreError> {
        let session = self.require(Capability::ManageInventory)?;
        Ok(inventory::add_book(&session.workspace, fields).await?)
    }

    pub async fn edit_book(&self, current_id: i64, fields: &BookFields) -> Result<(), CoreError> {
        let session = self.require(Capability::ManageInventory)?;
        Ok(inventory::edit_book(&session.workspace, current_id, fields).await?)
    }

    pub async fn remove_book(&self, book_id: i64) -> Result<RemovedBook, CoreError> {
        let session = self.require(Capability::ManageInventory)?;
        Ok(inventory::remove_book(&session.workspace, book_id).await?)
    }

    pub async fn find_book(&self, book_id: i64) -> Result<Book, CoreError> {
        let session = self.require(Capability::ManageInventory)?;
        Ok(inventory::find_book(&session.workspace, book_id).await?)
    }

    pub async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>, CoreError> {
        let session = self.require(Capability::ManageInventory)?;
        Ok(inventory::list_books(&session.workspace, filter).await?)
    }

    pub async fn list_removed_books(&self) -> Result<Vec<RemovedBook>, CoreError> {
        let session = self.require(Capability::ManageInventory)?;
        Ok(inventory::list_removed_books(&session.workspace).await?)
    }

    /// Whether any open loan references the catalog id. This is the derived
    /// view; `Book.status` is only a display hint.
    pub async fn book_on_loan(&self, book_id: i64) -> Result<bool, CoreError> {
        let session = self.require(Capability::ManageInventory)?;
        Ok(inventory::book_on_loan(&session.workspace, book_id).await?)
    }

    pub async fn add_reader(
        &self,
        name: &str,
        surname: &str,
        grade: &str,
    ) -> Result<i64, CoreError> {
        let session = self.require(Capability::ManageReaders)?;
        let id = readers::add_reader(&session.workspace, name, surname, grade).await?;
        audit::record(
            &session.workspace,
            Some(session.principal.user_id),
            &format!("added reader: {name} {surname}, grade: {grade}"),
        )
        .await?;
        Ok(id)
    }

    pub async fn list_readers(&self, needle: Option<&str>) -> Result<Vec<Reader>, CoreError> {
        let session = self.require(Capability::ManageReaders)?;
        Ok(readers::list_readers(&session.workspace, needle).await?)
    }

    pub async fn assign_book(&self, book_id: i64, reader_id: i64) -> Result<i64, CoreError> {
        let session = self.require(Capability::ManageReaders)?;
        let loan_id = loans::assign_book(&session.workspace, book_id, reader_id).await?;
        audit::record(
            &session.workspace,
            Some(session.principal.user_id),
            &format!("assigned book_id={book_id} to reader_id={reader_id}"),
        )
        .await?;
        Ok(loan_id)
    }

    pub async fn mark_returned(&self, loan_id: i64) -> Result<(), CoreError> {
        let session = self.require(Capability::ManageReaders)?;
        loans::mark_returned(&session.workspace, loan_id).await?;
        audit::record(
            &session.workspace,
            Some(session.principal.user_id),
            &format!("marked loan_id={loan_id} as returned"),
        )
        .await?;
        Ok(())
    }

    pub async fn mark_lost(&self, loan_id: i64) -> Result<(), CoreError> {
        let session = self.require(Capability::ManageReaders)?;
        loans::mark_lost(&session.workspace, loan_id).await?;
        audit::record(
            &session.workspace,
            Some(session.principal.user_id),
            &format!("marked loan_id={loan_id} as lost"),
        )
        .await?;
        Ok(())
    }

    pub async fn list_loans(&self) -> Result<Vec<Loan>, CoreError> {
        let session = self.require(Capability::ManageReaders)?;
        Ok(loans::list_loans(&session.workspace).await?)
    }

    pub async fn find_loan(&self, loan_id: i64) -> Result<Loan, CoreError> {
        let session = self.require(Capability::ManageReaders)?;
        Ok(loans::find_loan(&session.workspace, loan_id).await?)
    }
}
