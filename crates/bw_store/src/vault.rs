//! Encrypted vault lifecycle.
//!
//! At rest the store is a single sealed blob (`*.db.enc`). A session opens it
//! by decrypting the blob into a plaintext SQLite workspace file (`*.db`),
//! working against that file through a pooled connection, and re-sealing on
//! close. Only one session may hold a given store open at a time; an
//! exclusive lock on a `.lk` sibling file enforces that across processes.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fs2::FileExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use bw_crypto::{aead, kdf::VaultKey};

use crate::error::StoreError;

/// Authenticated associated data bound into every sealed vault blob.
pub const VAULT_AAD: &[u8] = b"bookworm-vault-v1";

/// How the plaintext workspace came to exist when this session opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceOrigin {
    /// No vault existed; a fresh empty workspace was created.
    Created,
    /// Decrypted from the sealed vault by this session.
    Decrypted,
    /// A plaintext workspace was already on disk (unclean shutdown) and was
    /// reused as-is.
    Reused,
}

/// Exclusive per-store session lock. Held for the lifetime of a [`Workspace`];
/// released (and the lock file removed) on drop.
pub struct SessionLock {
    file: fs::File,
    path: PathBuf,
}

impl SessionLock {
    pub fn acquire(vault_path: &Path) -> Result<Self, StoreError> {
        let mut path = vault_path.as_os_str().to_owned();
        path.push(".lk");
        let path = PathBuf::from(path);

        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| StoreError::WorkspaceBusy)?;
        debug!(lock = %path.display(), "session lock acquired");
        Ok(Self { file, path })
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = fs::remove_file(&self.path);
    }
}

/// An open, decrypted store. Owns the connection pool, the vault key used to
/// re-seal, and the session lock.
pub struct Workspace {
    pool: SqlitePool,
    workspace_path: PathBuf,
    vault_path: PathBuf,
    key: VaultKey,
    origin: WorkspaceOrigin,
    _lock: SessionLock,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("workspace_path", &self.workspace_path)
            .field("vault_path", &self.vault_path)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn origin(&self) -> WorkspaceOrigin {
        self.origin
    }

    pub fn workspace_path(&self) -> &Path {
        &self.workspace_path
    }

    pub fn vault_path(&self) -> &Path {
        &self.vault_path
    }

    /// Seal the workspace back into the vault file and delete the plaintext.
    ///
    /// The sealed blob is written to a temp sibling first and renamed into
    /// place, so a crash mid-persist never clobbers the previous vault.
    pub async fn persist(self) -> Result<(), StoreError> {
        self.pool.close().await;

        let plaintext = fs::read(&self.workspace_path)?;
        let sealed = aead::seal(&self.key, &plaintext, VAULT_AAD)?;

        let mut tmp_path = self.vault_path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(&sealed)?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &self.vault_path)?;

        if removable_workspace(&self.workspace_path) {
            fs::remove_file(&self.workspace_path)?;
        }
        info!(vault = %self.vault_path.display(), "store sealed");
        Ok(())
    }

    /// Close the pool and delete the plaintext workspace WITHOUT sealing.
    /// Used to back out of a freshly created store that should not survive.
    pub async fn discard(self) -> Result<(), StoreError> {
        self.pool.close().await;
        if removable_workspace(&self.workspace_path) {
            fs::remove_file(&self.workspace_path)?;
        }
        Ok(())
    }

    /// Close the pool and leave the plaintext workspace on disk untouched.
    pub async fn release(self) {
        self.pool.close().await;
    }
}

/// Open (or create) the store identified by `vault_path`, decrypting into
/// `workspace_path` with `key`.
///
/// Rejects with [`StoreError::WorkspaceBusy`] if another session holds the
/// store, and with [`StoreError::BadKey`] if the vault exists but the key
/// does not authenticate. On a bad key no plaintext is ever written.
pub async fn open(
    vault_path: &Path,
    workspace_path: &Path,
    key: VaultKey,
) -> Result<Workspace, StoreError> {
    let lock = SessionLock::acquire(vault_path)?;

    let origin = if workspace_path.exists() {
        warn!(
            workspace = %workspace_path.display(),
            "plaintext workspace already on disk; reusing (unclean shutdown?)"
        );
        WorkspaceOrigin::Reused
    } else if vault_path.exists() {
        let sealed = fs::read(vault_path)?;
        let plaintext =
            aead::open(&key, &sealed, VAULT_AAD).map_err(|_| StoreError::BadKey)?;
        write_private(workspace_path, &plaintext)?;
        WorkspaceOrigin::Decrypted
    } else {
        info!(vault = %vault_path.display(), "no vault on disk; creating a new store");
        WorkspaceOrigin::Created
    };

    let opts = SqliteConnectOptions::from_str(&format!(
        "sqlite://{}",
        workspace_path.display()
    ))
    .map_err(StoreError::Database)?
    .create_if_missing(true)
    // Truncate keeps the store a single file, which whole-file sealing needs.
    .journal_mode(SqliteJournalMode::Truncate);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    Ok(Workspace {
        pool,
        workspace_path: workspace_path.to_path_buf(),
        vault_path: vault_path.to_path_buf(),
        key,
        origin,
        _lock: lock,
    })
}

/// Copy the sealed vault blob to `dest`. The copy reflects the last persist,
/// not any in-flight session state.
pub fn backup(vault_path: &Path, dest: &Path) -> Result<(), StoreError> {
    if !vault_path.exists() {
        return Err(StoreError::NotFound(format!(
            "vault file {}",
            vault_path.display()
        )));
    }
    fs::copy(vault_path, dest)?;
    info!(dest = %dest.display(), "vault backed up");
    Ok(())
}

/// Replace the sealed vault with `src`. Refused while a session holds the
/// store open.
pub fn restore(vault_path: &Path, src: &Path) -> Result<(), StoreError> {
    let lock = SessionLock::acquire(vault_path).map_err(|e| match e {
        StoreError::WorkspaceBusy => StoreError::RestoreWhileOpen,
        other => other,
    })?;
    fs::copy(src, vault_path)?;
    info!(src = %src.display(), "vault restored");
    drop(lock);
    Ok(())
}

/// The workspace is deleted on close only when its name is unambiguously a
/// plaintext file. Guards against a misconfigured path pointing at the vault.
fn removable_workspace(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.ends_with(".db") && !name.ends_with(".db.enc"),
        None => false,
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    use std::os::unix::fs::OpenOptionsExt;
    let mut f = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    f.write_all(data)?;
    f.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut f = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    f.write_all(data)?;
    f.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bw_crypto::kdf::vault_key_from_credentials;
    use tempfile::tempdir;

    fn paths(dir: &Path) -> (PathBuf, PathBuf) {
        (dir.join("books.db.enc"), dir.join("books.db"))
    }

    #[tokio::test]
    async fn create_persist_reopen() {
        let dir = tempdir().unwrap();
        let (vault, work) = paths(dir.path());
        let key = vault_key_from_credentials("alice", "pw");

        let ws = open(&vault, &work, key).await.unwrap();
        assert_eq!(ws.origin(), WorkspaceOrigin::Created);
        sqlx::query("INSERT INTO readers (name, surname, grade) VALUES ('a', 'b', '1')")
            .execute(ws.pool())
            .await
            .unwrap();
        ws.persist().await.unwrap();

        assert!(vault.exists());
        assert!(!work.exists());

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        assert_eq!(ws.origin(), WorkspaceOrigin::Decrypted);
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers")
            .fetch_one(ws.pool())
            .await
            .unwrap();
        assert_eq!(n, 1);
        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn wrong_key_leaves_no_plaintext() {
        let dir = tempdir().unwrap();
        let (vault, work) = paths(dir.path());

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        ws.persist().await.unwrap();

        let bad = vault_key_from_credentials("alice", "wrong");
        let err = open(&vault, &work, bad).await.unwrap_err();
        assert!(matches!(err, StoreError::BadKey));
        assert!(!work.exists());
    }

    #[tokio::test]
    async fn second_session_is_rejected() {
        let dir = tempdir().unwrap();
        let (vault, work) = paths(dir.path());

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();

        let key2 = vault_key_from_credentials("alice", "pw");
        let err = open(&vault, &work, key2).await.unwrap_err();
        assert!(matches!(err, StoreError::WorkspaceBusy));

        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn leftover_workspace_is_reused() {
        let dir = tempdir().unwrap();
        let (vault, work) = paths(dir.path());

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        sqlx::query("INSERT INTO readers (name, surname, grade) VALUES ('x', 'y', '2')")
            .execute(ws.pool())
            .await
            .unwrap();
        // Simulate a crash: close the pool but leave the plaintext behind.
        ws.release().await;
        assert!(work.exists());

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        assert_eq!(ws.origin(), WorkspaceOrigin::Reused);
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers")
            .fetch_one(ws.pool())
            .await
            .unwrap();
        assert_eq!(n, 1);
        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn discard_removes_fresh_store() {
        let dir = tempdir().unwrap();
        let (vault, work) = paths(dir.path());

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        ws.discard().await.unwrap();
        assert!(!work.exists());
        assert!(!vault.exists());
    }

    #[tokio::test]
    async fn backup_and_restore_roundtrip() {
        let dir = tempdir().unwrap();
        let (vault, work) = paths(dir.path());
        let bak = dir.path().join("books.bak");

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        sqlx::query("INSERT INTO readers (name, surname, grade) VALUES ('a', 'b', '1')")
            .execute(ws.pool())
            .await
            .unwrap();
        ws.persist().await.unwrap();

        backup(&vault, &bak).unwrap();

        // Wipe the store, restore, and reopen.
        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        sqlx::query("DELETE FROM readers")
            .execute(ws.pool())
            .await
            .unwrap();
        ws.persist().await.unwrap();

        restore(&vault, &bak).unwrap();

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readers")
            .fetch_one(ws.pool())
            .await
            .unwrap();
        assert_eq!(n, 1);
        ws.persist().await.unwrap();
    }

    #[tokio::test]
    async fn restore_refused_while_open() {
        let dir = tempdir().unwrap();
        let (vault, work) = paths(dir.path());
        let bak = dir.path().join("books.bak");

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        ws.persist().await.unwrap();
        backup(&vault, &bak).unwrap();

        let key = vault_key_from_credentials("alice", "pw");
        let ws = open(&vault, &work, key).await.unwrap();
        let err = restore(&vault, &bak).unwrap_err();
        assert!(matches!(err, StoreError::RestoreWhileOpen));
        ws.persist().await.unwrap();
    }
}
