//! Principals, privileges and capability checks, plus the user-management
//! operations that mutate them.

use tracing::info;

use bw_store::models::User;
use bw_store::{audit, users};

use crate::error::CoreError;
use crate::session::SessionManager;

/// A grantable privilege tag. Stored in the legacy comma-delimited
/// `users.privileges` column as "db" / "reader".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    DbAdmin,
    ReaderAdmin,
}

impl Privilege {
    pub fn tag(self) -> &'static str {
        match self {
            Privilege::DbAdmin => "db",
            Privilege::ReaderAdmin => "reader",
        }
    }
}

/// The set of privilege tags held by a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrivilegeSet {
    pub db_admin: bool,
    pub reader_admin: bool,
}

impl PrivilegeSet {
    /// Parse the stored column value. Unknown tags are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut set = Self::default();
        for tag in raw.split(',') {
            match tag.trim() {
                "db" => set.db_admin = true,
                "reader" => set.reader_admin = true,
                _ => {}
            }
        }
        set
    }

    pub fn encode(self) -> String {
        let mut tags = Vec::new();
        if self.db_admin {
            tags.push("db");
        }
        if self.reader_admin {
            tags.push("reader");
        }
        tags.join(",")
    }

    pub fn contains(self, p: Privilege) -> bool {
        match p {
            Privilege::DbAdmin => self.db_admin,
            Privilege::ReaderAdmin => self.reader_admin,
        }
    }

    pub fn with(mut self, p: Privilege, granted: bool) -> Self {
        match p {
            Privilege::DbAdmin => self.db_admin = granted,
            Privilege::ReaderAdmin => self.reader_admin = granted,
        }
        self
    }
}

/// An operation class a principal may or may not perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageInventory,
    ManageReaders,
    SelectVaultFile,
    BackupRestore,
    ManageUsers,
    ViewAuditLog,
}

impl Capability {
    pub fn describe(self) -> &'static str {
        match self {
            Capability::ManageInventory => "inventory access",
            Capability::ManageReaders => "reader administration",
            Capability::SelectVaultFile => "store file selection",
            Capability::BackupRestore => "backup and restore",
            Capability::ManageUsers => "user administration",
            Capability::ViewAuditLog => "audit log access",
        }
    }
}

/// The authenticated identity with its resolved role and privileges.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub is_admin: bool,
    pub is_superadmin: bool,
    pub privileges: PrivilegeSet,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
            is_superadmin: user.is_superadmin,
            privileges: PrivilegeSet::parse(&user.privileges),
        }
    }

    pub fn allows(&self, cap: Capability) -> bool {
        if self.is_superadmin || self.is_admin {
            return true;
        }
        match cap {
            Capability::ManageInventory => true,
            Capability::ManageReaders => self.privileges.contains(Privilege::ReaderAdmin),
            Capability::SelectVaultFile | Capability::BackupRestore => {
                self.privileges.contains(Privilege::DbAdmin)
            }
            Capability::ManageUsers | Capability::ViewAuditLog => false,
        }
    }
}

impl SessionManager {
    pub async fn list_users(&self) -> Result<Vec<User>, CoreError> {
        let session = self.require(Capability::ManageUsers)?;
        Ok(users::list_users(&session.workspace).await?)
    }

    pub async fn promote_user(&self, user_id: i64) -> Result<(), CoreError> {
        let session = self.require(Capability::ManageUsers)?;
        users::find_user(&session.workspace, user_id).await?;
        users::set_admin(&session.workspace, user_id, true).await?;
        audit::record(
            &session.workspace,
            Some(session.principal.user_id),
            &format!("promoted user_id={user_id} to admin"),
        )
        .await?;
        info!(user_id, by = %session.principal.username, "user promoted");
        Ok(())
    }

    /// Revoke admin rights. Refused outright for the superadmin account.
    pub async fn demote_user(&self, user_id: i64) -> Result<(), CoreError> {
        let session = self.require(Capability::ManageUsers)?;
        let target = users::find_user(&session.workspace, user_id).await?;
        if target.is_superadmin {
            return Err(CoreError::Forbidden(
                "the superadmin account cannot be demoted".into(),
            ));
        }
        users::set_admin(&session.workspace, user_id, false).await?;
        audit::record(
            &session.workspace,
            Some(session.principal.user_id),
            &format!("demoted user_id={user_id} from admin"),
        )
        .await?;
        Ok(())
    }

    /// Delete an account. Refused for the superadmin and for the acting
    /// principal's own account.
    pub async fn delete_user(&self, user_id: i64) -> Result<(), CoreError> {
        let session = self.require(Capability::ManageUsers)?;
        let target = users::find_user(&session.workspace, user_id).await?;
        if target.is_superadmin {
            return Err(CoreError::Forbidden(
                "the superadmin account cannot be deleted".into(),
            ));
        }
        if user_id == session.principal.user_id {
            return Err(CoreError::Forbidden(
                "cannot delete the currently logged-in account".into(),
            ));
        }
        users::delete_user(&session.workspace, user_id).await?;
        audit::record(
            &session.workspace,
            Some(session.principal.user_id),
            &format!("deleted user_id={user_id}"),
        )
        .await?;
        Ok(())
    }

    pub async fn grant_privilege(&self, user_id: i64, p: Privilege) -> Result<(), CoreError> {
        self.set_privilege(user_id, p, true).await
    }

    pub async fn revoke_privilege(&self, user_id: i64, p: Privilege) -> Result<(), CoreError> {
        self.set_privilege(user_id, p, false).await
    }

    async fn set_privilege(
        &self,
        user_id: i64,
        p: Privilege,
        granted: bool,
    ) -> Result<(), CoreError> {
        let session = self.require(Capability::ManageUsers)?;
        let target = users::find_user(&session.workspace, user_id).await?;
        if target.is_superadmin && !granted {
            return Err(CoreError::Forbidden(
                "the superadmin account cannot have rights revoked".into(),
            ));
        }
        let updated = PrivilegeSet::parse(&target.privileges).with(p, granted);
        users::set_privileges(&session.workspace, user_id, &updated.encode()).await?;
        let verb = if granted { "granted" } else { "revoked" };
        let prep = if granted { "to" } else { "from" };
        audit::record(
            &session.workspace,
            Some(session.principal.user_id),
            &format!("{verb} {} {prep} user_id={user_id}", p.tag()),
        )
        .await?;
        Ok(())
    }

    /// The most recent audit entries, newest first.
    pub async fn audit_log(
        &self,
        limit: i64,
    ) -> Result<Vec<bw_store::models::LogEntry>, CoreError> {
        let session = self.require(Capability::ViewAuditLog)?;
        Ok(audit::recent(&session.workspace, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_admin: bool, is_superadmin: bool, privileges: &str) -> User {
        User {
            id: 1,
            username: "u".into(),
            password: "p".into(),
            is_admin,
            is_superadmin,
            privileges: privileges.into(),
        }
    }

    #[test]
    fn privilege_set_roundtrip() {
        let set = PrivilegeSet::parse("db,reader");
        assert!(set.db_admin && set.reader_admin);
        assert_eq!(set.encode(), "db,reader");

        let set = PrivilegeSet::parse(" reader , bogus ");
        assert!(!set.db_admin && set.reader_admin);
        assert_eq!(set.encode(), "reader");

        assert_eq!(PrivilegeSet::parse("").encode(), "");
    }

    #[test]
    fn ordinary_user_capabilities() {
        let p = Principal::from_user(&user(false, false, ""));
        assert!(p.allows(Capability::ManageInventory));
        assert!(!p.allows(Capability::ManageReaders));
        assert!(!p.allows(Capability::BackupRestore));
        assert!(!p.allows(Capability::ManageUsers));
        assert!(!p.allows(Capability::ViewAuditLog));
    }

    #[test]
    fn privilege_tags_open_their_panels() {
        let p = Principal::from_user(&user(false, false, "reader"));
        assert!(p.allows(Capability::ManageReaders));
        assert!(!p.allows(Capability::BackupRestore));

        let p = Principal::from_user(&user(false, false, "db"));
        assert!(p.allows(Capability::SelectVaultFile));
        assert!(p.allows(Capability::BackupRestore));
        assert!(!p.allows(Capability::ManageReaders));
    }

    #[test]
    fn admins_allow_everything() {
        for p in [
            Principal::from_user(&user(true, false, "")),
            Principal::from_user(&user(false, true, "")),
        ] {
            assert!(p.allows(Capability::ManageUsers));
            assert!(p.allows(Capability::ManageReaders));
            assert!(p.allows(Capability::BackupRestore));
            assert!(p.allows(Capability::ViewAuditLog));
        }
    }
}
