//! Encrypted local store for the Bookworm library manager.
//!
//! The store is a single SQLite database kept sealed at rest as one
//! authenticated blob. [`vault`] owns the open/persist lifecycle; the other
//! modules are plain data access over the open [`vault::Workspace`].

pub mod audit;
pub mod error;
pub mod inventory;
pub mod loans;
pub mod models;
pub mod readers;
pub mod users;
pub mod vault;

pub use error::StoreError;
pub use vault::{Workspace, WorkspaceOrigin};
