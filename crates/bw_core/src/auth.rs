//! Login, registration and logout.
//!
//! The credential does double duty: it is compared against the stored user
//! row AND it derives the vault key, so a wrong password usually fails at
//! decryption before the user table is ever consulted. This mirrors the
//! store's on-disk compatibility contract; see DESIGN.md for the trade-offs.

use std::time::Instant;

use tracing::{info, warn};

use bw_crypto::kdf::vault_key_from_credentials;
use bw_store::{audit, users, vault, StoreError, Workspace, WorkspaceOrigin};

use crate::access::Principal;
use crate::error::CoreError;
use crate::session::{ActiveSession, SessionManager};
use crate::settings::store_paths;

impl SessionManager {
    /// Authenticate and open the session. At most one session may be active.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Principal, CoreError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(CoreError::InvalidInput(
                "username and password are required".into(),
            ));
        }
        if self.active.is_some() {
            return Err(CoreError::InvalidInput("a session is already active".into()));
        }

        let now = Instant::now();
        if let Err(rem) = self.lockout.begin_attempt(now) {
            return Err(CoreError::LockedOut {
                remaining_secs: rem.as_secs().max(1),
            });
        }

        let key = vault_key_from_credentials(username, password);
        let (vault_path, workspace_path) = store_paths(&self.settings, self.language, username)?;

        let ws = match vault::open(&vault_path, &workspace_path, key).await {
            Ok(ws) => ws,
            Err(StoreError::BadKey) => {
                self.lockout.record_failure(now);
                warn!(username, "login rejected: key did not open the vault");
                return Err(CoreError::AuthenticationFailed);
            }
            Err(other) => return Err(other.into()),
        };

        match users::find_by_username(&ws, username).await {
            Ok(Some(user)) if user.password == password => {
                self.lockout.reset();
                audit::record(&ws, Some(user.id), &format!("login (user: {username})")).await?;
                let principal = Principal::from_user(&user);
                info!(username, "login");
                self.active = Some(ActiveSession {
                    workspace: ws,
                    principal: principal.clone(),
                });
                Ok(principal)
            }
            Ok(found) => {
                self.lockout.record_failure(now);
                warn!(username, "login rejected: credential mismatch");
                abandon(ws, username, found.map(|u| u.id)).await?;
                Err(CoreError::AuthenticationFailed)
            }
            Err(err) => {
                close_quiet(ws).await;
                Err(err.into())
            }
        }
    }

    /// Create an account.
    ///
    /// The very first account in a store becomes the sole, permanent
    /// superadmin and requires `confirm_superadmin` since its credential is
    /// unrecoverable. While a session is active the new account is inserted
    /// into the open workspace and becomes the acting principal; the store
    /// stays keyed to the credential that opened it.
    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
        confirm_superadmin: bool,
    ) -> Result<Principal, CoreError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(CoreError::InvalidInput(
                "username and password are required".into(),
            ));
        }

        if let Some(session) = &self.active {
            let ws = &session.workspace;
            let id = users::insert_user(ws, username, password, false, false).await?;
            audit::record(ws, Some(id), &format!("user_created (user: {username})")).await?;
            let user = users::find_user(ws, id).await?;
            let principal = Principal::from_user(&user);
            info!(username, "user registered");
            if let Some(session) = self.active.as_mut() {
                session.principal = principal.clone();
            }
            return Ok(principal);
        }

        let key = vault_key_from_credentials(username, password);
        let (vault_path, workspace_path) = store_paths(&self.settings, self.language, username)?;

        let ws = match vault::open(&vault_path, &workspace_path, key).await {
            Ok(ws) => ws,
            Err(StoreError::BadKey) => return Err(CoreError::AuthenticationFailed),
            Err(other) => return Err(other.into()),
        };

        let count = match users::count_users(&ws).await {
            Ok(n) => n,
            Err(err) => {
                close_quiet(ws).await;
                return Err(err.into());
            }
        };

        let (id, is_first) = if count == 0 {
            if !confirm_superadmin {
                ws.discard().await?;
                return Err(CoreError::InvalidInput(
                    "creating the first account requires superadmin confirmation".into(),
                ));
            }
            match users::insert_user(&ws, username, password, true, true).await {
                Ok(id) => (id, true),
                Err(err) => {
                    close_quiet(ws).await;
                    return Err(err.into());
                }
            }
        } else {
            match users::insert_user(&ws, username, password, false, false).await {
                Ok(id) => (id, false),
                Err(err) => {
                    close_quiet(ws).await;
                    return Err(err.into());
                }
            }
        };

        let action = if is_first {
            format!("admin_created (user: {username})")
        } else {
            format!("user_created (user: {username})")
        };
        audit::record(&ws, Some(id), &action).await?;

        let user = users::find_user(&ws, id).await?;
        let principal = Principal::from_user(&user);
        info!(username, superadmin = is_first, "account registered");
        self.active = Some(ActiveSession {
            workspace: ws,
            principal: principal.clone(),
        });
        Ok(principal)
    }

    /// Seal the store and return to the unauthenticated state. If sealing
    /// fails the session is still closed; the plaintext workspace remains on
    /// disk and is picked up by the next login.
    pub async fn logout(&mut self) -> Result<(), CoreError> {
        let session = self
            .active
            .take()
            .ok_or_else(|| CoreError::InvalidInput("no active session".into()))?;
        info!(username = %session.principal.username, "logout");
        session.workspace.persist().await?;
        Ok(())
    }
}

/// Back out of a workspace after a failed credential check. The failure is
/// audited whenever a store exists to audit into.
async fn abandon(ws: Workspace, username: &str, failed_user: Option<i64>) -> Result<(), CoreError> {
    match ws.origin() {
        WorkspaceOrigin::Created => ws.discard().await?,
        WorkspaceOrigin::Decrypted => {
            audit::record(&ws, failed_user, &format!("failed_login (user: {username})")).await?;
            ws.persist().await?;
        }
        WorkspaceOrigin::Reused => {
            audit::record(&ws, failed_user, &format!("failed_login (user: {username})")).await?;
            ws.release().await;
        }
    }
    Ok(())
}

/// Close a workspace on an internal error path, best effort.
async fn close_quiet(ws: Workspace) {
    match ws.origin() {
        WorkspaceOrigin::Created => {
            if let Err(err) = ws.discard().await {
                warn!(%err, "failed to discard fresh workspace");
            }
        }
        WorkspaceOrigin::Decrypted => {
            if let Err(err) = ws.persist().await {
                warn!(%err, "failed to seal workspace; plaintext left for next login");
            }
        }
        WorkspaceOrigin::Reused => ws.release().await,
    }
}
