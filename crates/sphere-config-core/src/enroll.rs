// crates/sphere-config-core/src/enroll.rs
// ============================================================================
// Module: Sphere Enrollment Credentials
// Description: Enrollment key, session token, and erasure-tracking holder.
// Purpose: Make the exchange-then-erase credential invariant mechanically checkable.
// Dependencies: thiserror, std
// ============================================================================

//! ## Overview
//! An enrollment key (`sphr_enroll_*`, capability `device:register` only) is
//! exchanged exactly once for a session JWT, after which the key is erased.
//! [`CredentialHolder`] is the single in-memory home for both credentials:
//! the exchange happens under one mutex guard, so no reader can observe a
//! state where the JWT exists and the enrollment key is still retained.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Mutex;

use thiserror::Error;

use crate::validate::ENROLLMENT_KEY_PREFIX;

// ============================================================================
// SECTION: Enrollment Key
// ============================================================================

/// Errors produced when parsing an enrollment key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrollmentKeyError {
    /// Key string was empty.
    #[error("enrollment key is empty")]
    Empty,
    /// Key did not carry the required prefix.
    #[error("enrollment key must start with {ENROLLMENT_KEY_PREFIX}")]
    BadPrefix,
}

/// A scoped enrollment credential (`device:register` only).
///
/// # Invariants
/// - Always non-empty and prefixed `sphr_enroll_`.
/// - Never echoed through `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct EnrollmentKey(String);

impl EnrollmentKey {
    /// Parses and validates an enrollment key.
    ///
    /// # Errors
    ///
    /// Returns [`EnrollmentKeyError`] when the key is empty or mis-prefixed.
    pub fn parse(key: impl Into<String>) -> Result<Self, EnrollmentKeyError> {
        let key = key.into();
        if key.is_empty() {
            return Err(EnrollmentKeyError::Empty);
        }
        if !key.starts_with(ENROLLMENT_KEY_PREFIX) || key.len() == ENROLLMENT_KEY_PREFIX.len() {
            return Err(EnrollmentKeyError::BadPrefix);
        }
        Ok(Self(key))
    }

    /// Returns the key material for the exchange request.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EnrollmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnrollmentKey(redacted)")
    }
}

// ============================================================================
// SECTION: Session Token
// ============================================================================

/// A session credential (JWT) obtained by exchanging an enrollment key.
///
/// # Invariants
/// - Opaque to this crate; never inspected or decoded.
/// - Never echoed through `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a backend-issued session token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token material for request authorization.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(redacted)")
    }
}

// ============================================================================
// SECTION: Credential State
// ============================================================================

/// Observable credential lifecycle state.
///
/// # Invariants
/// - Transitions only move forward: `Present` -> `Exchanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    /// Enrollment key held; no session token yet.
    Present,
    /// Session token held; enrollment key erased.
    Exchanged,
    /// Neither credential held.
    Erased,
}

/// Errors produced by credential holder transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Exchange attempted with no enrollment key present.
    #[error("no enrollment key held")]
    NoEnrollmentKey,
    /// Exchange attempted after a previous exchange completed.
    #[error("enrollment key already exchanged")]
    AlreadyExchanged,
    /// The holder mutex was poisoned by a panicking writer.
    #[error("credential holder lock poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Credential Holder
// ============================================================================

/// Mutex-guarded slot contents.
struct CredentialSlot {
    /// Enrollment key, present until exchanged.
    key: Option<EnrollmentKey>,
    /// Session token, present after exchange.
    token: Option<SessionToken>,
}

/// In-memory holder enforcing the exchange-then-erase invariant.
///
/// # Invariants
/// - `key` and `token` are never both observable as present.
/// - [`CredentialHolder::complete_exchange`] is the only mutation entry
///   point; it stores the token and erases the key under one lock guard.
pub struct CredentialHolder {
    /// Guarded credential slot.
    slot: Mutex<CredentialSlot>,
}

impl CredentialHolder {
    /// Creates a holder seeded with an enrollment key.
    #[must_use]
    pub fn new(key: EnrollmentKey) -> Self {
        Self {
            slot: Mutex::new(CredentialSlot {
                key: Some(key),
                token: None,
            }),
        }
    }

    /// Creates an empty holder (no credentials yet).
    #[must_use]
    pub fn empty() -> Self {
        Self {
            slot: Mutex::new(CredentialSlot {
                key: None,
                token: None,
            }),
        }
    }

    /// Stores the session token and erases the enrollment key atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when no key is held, a previous exchange
    /// already completed, or the lock is poisoned.
    pub fn complete_exchange(&self, token: SessionToken) -> Result<(), CredentialError> {
        let mut slot = self.slot.lock().map_err(|_| CredentialError::Poisoned)?;
        if slot.token.is_some() {
            return Err(CredentialError::AlreadyExchanged);
        }
        if slot.key.is_none() {
            return Err(CredentialError::NoEnrollmentKey);
        }
        slot.token = Some(token);
        slot.key = None;
        Ok(())
    }

    /// Returns the enrollment key when still present.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Poisoned`] when the lock is poisoned.
    pub fn enrollment_key(&self) -> Result<Option<EnrollmentKey>, CredentialError> {
        let slot = self.slot.lock().map_err(|_| CredentialError::Poisoned)?;
        Ok(slot.key.clone())
    }

    /// Returns the session token when present.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Poisoned`] when the lock is poisoned.
    pub fn session_token(&self) -> Result<Option<SessionToken>, CredentialError> {
        let slot = self.slot.lock().map_err(|_| CredentialError::Poisoned)?;
        Ok(slot.token.clone())
    }

    /// Returns the observable lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Poisoned`] when the lock is poisoned.
    pub fn state(&self) -> Result<CredentialState, CredentialError> {
        let slot = self.slot.lock().map_err(|_| CredentialError::Poisoned)?;
        Ok(match (&slot.key, &slot.token) {
            (Some(_), _) => CredentialState::Present,
            (None, Some(_)) => CredentialState::Exchanged,
            (None, None) => CredentialState::Erased,
        })
    }
}
