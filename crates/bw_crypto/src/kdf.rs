//! Vault key derivation.
//!
//! `vault_key_from_credentials` turns the (username, password) pair into the
//! 32-byte key that encrypts the store file. The function is a pure digest so
//! a returning user can re-derive the same key at every login; no key
//! material is ever persisted.

use sha2::{Digest, Sha256};
use zeroize::ZeroizeOnDrop;

/// 32-byte vault key derived from the login credentials. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
pub struct VaultKey(pub [u8; 32]);

/// Derive the vault key: SHA-256 over `username || password`.
///
/// The credential that authenticates the user doubles as the key input, so a
/// lost credential makes the store unrecoverable. Callers must reject empty
/// inputs before calling.
pub fn vault_key_from_credentials(username: &str, password: &str) -> VaultKey {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(password.as_bytes());
    VaultKey(hasher.finalize().into())
}
