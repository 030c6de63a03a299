//! Session state: the open workspace, the authenticated principal, and the
//! login throttle.
//!
//! All mutable session state lives in one explicit [`SessionManager`] value
//! passed around by the caller; there are no ambient globals.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use bw_store::Workspace;

use crate::access::{Capability, Principal};
use crate::error::CoreError;
use crate::lang::Language;
use crate::settings::Settings;

pub const MAX_LOGIN_ATTEMPTS: u32 = 5;
pub const LOGIN_LOCKOUT_SECS: u64 = 60;

/// Failed-login throttle. One counter covers the whole process, whichever
/// usernames the attempts name. Time is passed in explicitly so the window
/// logic is testable without sleeping.
#[derive(Debug, Default)]
pub struct LockoutState {
    failures: u32,
    last_failure: Option<Instant>,
}

impl LockoutState {
    /// Time left in the cooldown window, or `None` when attempts are allowed.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        if self.failures < MAX_LOGIN_ATTEMPTS {
            return None;
        }
        let last = self.last_failure?;
        let window = Duration::from_secs(LOGIN_LOCKOUT_SECS);
        let elapsed = now.saturating_duration_since(last);
        if elapsed < window {
            Some(window - elapsed)
        } else {
            None
        }
    }

    /// Gate a new attempt. Once the cooldown has elapsed the counter resets
    /// to zero; while it is active the remaining time is returned.
    pub fn begin_attempt(&mut self, now: Instant) -> Result<(), Duration> {
        if let Some(rem) = self.remaining(now) {
            return Err(rem);
        }
        if self.failures >= MAX_LOGIN_ATTEMPTS {
            self.reset();
        }
        Ok(())
    }

    pub fn record_failure(&mut self, now: Instant) {
        self.failures += 1;
        self.last_failure = Some(now);
    }

    pub fn reset(&mut self) {
        self.failures = 0;
        self.last_failure = None;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

/// An authenticated session: the decrypted workspace plus the principal
/// acting through it.
pub struct ActiveSession {
    pub(crate) workspace: Workspace,
    pub(crate) principal: Principal,
}

impl ActiveSession {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// Owner of all session state. At most one session is active at a time; every
/// core operation goes through this value.
pub struct SessionManager {
    pub(crate) settings: Settings,
    pub(crate) settings_path: PathBuf,
    pub(crate) language: Language,
    pub(crate) lockout: LockoutState,
    pub(crate) active: Option<ActiveSession>,
}

impl SessionManager {
    /// Load settings from `settings_path` (defaults if absent) and start in
    /// the unauthenticated state.
    pub fn new(settings_path: impl Into<PathBuf>) -> Self {
        let settings_path = settings_path.into();
        let settings = Settings::load(&settings_path);
        let language = settings.default_language;
        Self {
            settings,
            settings_path,
            language,
            lockout: LockoutState::default(),
            active: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Switch the session language. Only legal while logged out, since the
    /// language participates in the default store filename.
    pub fn set_language(&mut self, language: Language) -> Result<(), CoreError> {
        if self.active.is_some() {
            return Err(CoreError::InvalidInput(
                "cannot switch language during an active session".into(),
            ));
        }
        self.language = language;
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        self.active.is_some()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.active.as_ref().map(|s| &s.principal)
    }

    pub(crate) fn session(&self) -> Result<&ActiveSession, CoreError> {
        self.active
            .as_ref()
            .ok_or_else(|| CoreError::InvalidInput("no active session".into()))
    }

    /// Resolve the active session and check that its principal holds `cap`.
    pub(crate) fn require(&self, cap: Capability) -> Result<&ActiveSession, CoreError> {
        let session = self.session()?;
        if !session.principal.allows(cap) {
            return Err(CoreError::Forbidden(format!(
                "{} requires {}",
                session.principal.username,
                cap.describe()
            )));
        }
        Ok(session)
    }
}
