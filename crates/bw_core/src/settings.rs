//! Settings document and store path resolution.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bw_store::vault;

use crate::access::Capability;
use crate::error::CoreError;
use crate::lang::Language;
use crate::session::SessionManager;

/// Persisted application settings (a small JSON document next to the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_language: Language,
    pub theme: String,
    /// Administrator-selected store path. When unset, a per-user default
    /// under the platform data directory is used.
    pub db_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_language: Language::En,
            theme: "default".into(),
            db_file: None,
        }
    }
}

impl Settings {
    /// Load from `path`, falling back to defaults when the file is missing
    /// or unreadable. A malformed settings file must never block login.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(path = %path.display(), %err, "malformed settings; using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::StorageFailure(e.into()))?;
        }
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::InvalidInput(e.to_string()))?;
        fs::write(path, raw).map_err(|e| CoreError::StorageFailure(e.into()))?;
        Ok(())
    }
}

/// Platform data directory for default store files.
pub fn default_data_dir() -> Result<PathBuf, CoreError> {
    ProjectDirs::from("com", "bookworm", "bookworm")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| CoreError::InvalidInput("no home directory available".into()))
}

/// Resolve the (vault, workspace) path pair for a login.
///
/// With no override each (language, username) pair gets its own store file;
/// an administrator-selected `db_file` names a shared workspace instead.
pub fn store_paths(
    settings: &Settings,
    language: Language,
    username: &str,
) -> Result<(PathBuf, PathBuf), CoreError> {
    let workspace = match &settings.db_file {
        Some(chosen) => {
            // Accept either the workspace or the sealed file being selected.
            let name = chosen
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| CoreError::InvalidInput("invalid store path".into()))?;
            match name.strip_suffix(".enc") {
                Some(stripped) => chosen.with_file_name(stripped),
                None => chosen.clone(),
            }
        }
        None => {
            let dir = default_data_dir()?;
            fs::create_dir_all(&dir).map_err(|e| CoreError::StorageFailure(e.into()))?;
            dir.join(format!("books_{}_{}.db", language.code(), username))
        }
    };

    let mut vault = workspace.as_os_str().to_owned();
    vault.push(".enc");
    Ok((PathBuf::from(vault), workspace))
}

impl SessionManager {
    /// Point future logins at a different store file and persist the choice.
    pub fn set_store_path(&mut self, path: Option<PathBuf>) -> Result<(), CoreError> {
        self.require(Capability::SelectVaultFile)?;
        self.settings.db_file = path;
        self.settings.save(&self.settings_path)?;
        info!(db_file = ?self.settings.db_file, "store path updated");
        Ok(())
    }

    /// Copy the sealed store to `dest`. The copy reflects the last persist;
    /// changes made in the current session are not yet included.
    pub fn backup_store(&self, dest: &Path) -> Result<(), CoreError> {
        let session = self.require(Capability::BackupRestore)?;
        warn!("backing up the last persisted state; current session changes are excluded");
        vault::backup(session.workspace.vault_path(), dest)?;
        Ok(())
    }

    /// Replace the sealed store with `src`. The current session is persisted
    /// and closed first; the caller must log in again afterwards.
    pub async fn restore_store(&mut self, src: &Path) -> Result<(), CoreError> {
        let session = self.require(Capability::BackupRestore)?;
        let vault_path = session.workspace.vault_path().to_path_buf();
        self.logout().await?;
        vault::restore(&vault_path, src)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_when_missing_or_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let s = Settings::load(&path);
        assert_eq!(s.default_language, Language::En);
        assert!(s.db_file.is_none());

        fs::write(&path, "{ not json").unwrap();
        let s = Settings::load(&path);
        assert_eq!(s.theme, "default");
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf/settings.json");

        let s = Settings {
            default_language: Language::Pl,
            theme: "dark".into(),
            db_file: Some(PathBuf::from("/tmp/shared.db")),
        };
        s.save(&path).unwrap();
        let loaded = Settings::load(&path);
        assert_eq!(loaded.default_language, Language::Pl);
        assert_eq!(loaded.theme, "dark");
        assert_eq!(loaded.db_file, Some(PathBuf::from("/tmp/shared.db")));
    }

    #[test]
    fn override_path_wins_and_enc_suffix_is_stripped() {
        let settings = Settings {
            db_file: Some(PathBuf::from("/data/shared.db")),
            ..Default::default()
        };
        let (vault, work) = store_paths(&settings, Language::En, "alice").unwrap();
        assert_eq!(work, PathBuf::from("/data/shared.db"));
        assert_eq!(vault, PathBuf::from("/data/shared.db.enc"));

        let settings = Settings {
            db_file: Some(PathBuf::from("/data/shared.db.enc")),
            ..Default::default()
        };
        let (vault, work) = store_paths(&settings, Language::En, "alice").unwrap();
        assert_eq!(work, PathBuf::from("/data/shared.db"));
        assert_eq!(vault, PathBuf::from("/data/shared.db.enc"));
    }
}
