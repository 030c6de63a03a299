use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("AEAD encryption failed")]
    AeadSeal,

    #[error("AEAD decryption failed (wrong key or corrupt vault)")]
    AeadOpen,
}
