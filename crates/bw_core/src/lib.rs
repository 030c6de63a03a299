//! Core services for the Bookworm library manager: session lifecycle over an
//! encrypted store, authentication with login throttling, capability-based
//! access control, inventory and lending operations, and the audit log.
//!
//! All state flows through [`SessionManager`]; callers (UI, tooling) receive
//! [`CoreError`] values, never panics, across this boundary.

pub mod access;
pub mod auth;
pub mod error;
pub mod inventory;
pub mod lang;
pub mod session;
pub mod settings;

pub use access::{Capability, Principal, Privilege, PrivilegeSet};
pub use error::CoreError;
pub use lang::Language;
pub use session::{SessionManager, LOGIN_LOCKOUT_SECS, MAX_LOGIN_ATTEMPTS};
pub use settings::Settings;
