//! Cryptographic primitives for the Bookworm encrypted store.
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize key material on drop.
//!
//! # Module layout
//! - `kdf`: deterministic vault key from the (username, password) pair
//! - `aead`: XChaCha20-Poly1305 seal/open over the serialized store bytes
//! - `error`: unified error type

pub mod aead;
pub mod error;
pub mod kdf;

pub use error::CryptoError;
