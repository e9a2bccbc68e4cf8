// crates/sphere-agent-resolver/src/lifecycle.rs
// ============================================================================
// Module: Sphere Enrollment Lifecycle
// Description: Device enrollment state machine with credential custody.
// Purpose: Drive unenrolled -> enrolling -> enrolled with atomic key erasure.
// Dependencies: sphere-config-core, thiserror
// ============================================================================

//! ## Overview
//! The lifecycle is an explicit state object passed by handle to whichever
//! component needs it, never an ambient global. Transitions go through named
//! methods under one mutex: `begin_enrollment` (resolver succeeded, key in
//! hand), `complete_enrollment` (JWT obtained; the enrollment key is erased
//! in the same step via [`CredentialHolder`]), `fail_enrollment` (terminal),
//! and the refresh pair. Refresh requested while enrolling is deferred, not
//! interleaved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use sphere_config_core::AgentConfigDocument;
use sphere_config_core::CredentialError;
use sphere_config_core::CredentialHolder;
use sphere_config_core::EnrollmentKey;
use sphere_config_core::EnrollmentKeyError;
use sphere_config_core::SessionToken;
use thiserror::Error;

use crate::candidate::SourceKind;
use crate::resolver::Resolution;

// ============================================================================
// SECTION: Enrollment Phases
// ============================================================================

/// Observable enrollment lifecycle phase.
///
/// # Invariants
/// - `EnrollmentFailed` is terminal within a session; a new boot starts a
///   fresh lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentPhase {
    /// No configuration resolved yet.
    Unenrolled,
    /// Config resolved; enrollment key being exchanged for a JWT.
    Enrolling,
    /// JWT held; enrollment key erased.
    Enrolled,
    /// Daily config refresh in progress.
    Refreshing,
    /// No candidate validated or the exchange was permanently rejected.
    EnrollmentFailed,
}

impl EnrollmentPhase {
    /// Returns a stable label for reporting.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unenrolled => "unenrolled",
            Self::Enrolling => "enrolling",
            Self::Enrolled => "enrolled",
            Self::Refreshing => "refreshing",
            Self::EnrollmentFailed => "enrollment_failed",
        }
    }
}

// ============================================================================
// SECTION: Lifecycle Errors
// ============================================================================

/// Errors produced by lifecycle transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The requested transition is not legal from the current phase.
    #[error("cannot {action} in phase {phase}", phase = .from.as_str())]
    InvalidTransition {
        /// Phase the lifecycle was in.
        from: EnrollmentPhase,
        /// Attempted action.
        action: &'static str,
    },
    /// Refresh requested while an enrollment is in progress.
    #[error("refresh deferred: enrollment in progress")]
    RefreshDeferred,
    /// Credential holder rejected the transition.
    #[error("credential failure: {0}")]
    Credential(#[from] CredentialError),
    /// Resolved document carried an unusable enrollment key.
    #[error("resolved document carried an invalid enrollment key: {0}")]
    InvalidKey(#[from] EnrollmentKeyError),
    /// Lifecycle mutex was poisoned.
    #[error("lifecycle lock poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Lifecycle State
// ============================================================================

/// Mutex-guarded lifecycle contents.
struct LifecycleInner {
    /// Current phase.
    phase: EnrollmentPhase,
    /// Active configuration document, once resolved.
    active: Option<AgentConfigDocument>,
    /// Provenance of the active document.
    provenance: Option<SourceKind>,
    /// Credential custody for the current enrollment.
    credentials: Arc<CredentialHolder>,
    /// Terminal failure description, when failed.
    failure: Option<String>,
}

/// Enrollment lifecycle state machine.
///
/// # Invariants
/// - All mutation happens under one mutex; readers see whole phases.
/// - The enrollment key is never observable after `complete_enrollment`.
pub struct EnrollmentLifecycle {
    /// Guarded state.
    inner: Mutex<LifecycleInner>,
}

impl Default for EnrollmentLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrollmentLifecycle {
    /// Creates a lifecycle in the unenrolled phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LifecycleInner {
                phase: EnrollmentPhase::Unenrolled,
                active: None,
                provenance: None,
                credentials: Arc::new(CredentialHolder::empty()),
                failure: None,
            }),
        }
    }

    /// Accepts a resolution and moves to `Enrolling`, seeding the credential
    /// holder with the document's enrollment key.
    ///
    /// Legal from `Unenrolled` and, for a caller-driven retry, from
    /// `EnrollmentFailed`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] on an illegal transition or an unusable
    /// enrollment key.
    pub fn begin_enrollment(&self, resolution: Resolution) -> Result<EnrollmentKey, LifecycleError> {
        let mut inner = self.lock()?;
        match inner.phase {
            EnrollmentPhase::Unenrolled | EnrollmentPhase::EnrollmentFailed => {}
            from => {
                return Err(LifecycleError::InvalidTransition {
                    from,
                    action: "begin enrollment",
                });
            }
        }
        let key = EnrollmentKey::parse(resolution.document.enrollment_api_key.clone())?;
        inner.credentials = Arc::new(CredentialHolder::new(key.clone()));
        inner.active = Some(resolution.document);
        inner.provenance = Some(resolution.provenance);
        inner.failure = None;
        inner.phase = EnrollmentPhase::Enrolling;
        Ok(key)
    }

    /// Records a successful key exchange: stores the JWT, erases the key,
    /// and moves to `Enrolled`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError`] on an illegal transition or a credential
    /// holder failure.
    pub fn complete_enrollment(&self, token: SessionToken) -> Result<(), LifecycleError> {
        let mut inner = self.lock()?;
        if inner.phase != EnrollmentPhase::Enrolling {
            return Err(LifecycleError::InvalidTransition {
                from: inner.phase,
                action: "complete enrollment",
            });
        }
        inner.credentials.complete_exchange(token)?;
        inner.phase = EnrollmentPhase::Enrolled;
        Ok(())
    }

    /// Records a terminal enrollment failure.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when already enrolled.
    pub fn fail_enrollment(&self, reason: impl Into<String>) -> Result<(), LifecycleError> {
        let mut inner = self.lock()?;
        match inner.phase {
            EnrollmentPhase::Unenrolled | EnrollmentPhase::Enrolling => {}
            from => {
                return Err(LifecycleError::InvalidTransition {
                    from,
                    action: "fail enrollment",
                });
            }
        }
        inner.failure = Some(reason.into());
        inner.phase = EnrollmentPhase::EnrollmentFailed;
        Ok(())
    }

    /// Starts a refresh pass.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::RefreshDeferred`] while an enrollment is in
    /// progress and [`LifecycleError::InvalidTransition`] from any phase
    /// other than `Enrolled`.
    pub fn begin_refresh(&self) -> Result<(), LifecycleError> {
        let mut inner = self.lock()?;
        match inner.phase {
            EnrollmentPhase::Enrolled => {
                inner.phase = EnrollmentPhase::Refreshing;
                Ok(())
            }
            EnrollmentPhase::Enrolling => Err(LifecycleError::RefreshDeferred),
            from => Err(LifecycleError::InvalidTransition {
                from,
                action: "begin refresh",
            }),
        }
    }

    /// Finishes a refresh pass, swapping in the superseding document when
    /// the backend reported a change.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when no refresh is in
    /// progress.
    pub fn finish_refresh(
        &self,
        updated: Option<AgentConfigDocument>,
    ) -> Result<(), LifecycleError> {
        let mut inner = self.lock()?;
        if inner.phase != EnrollmentPhase::Refreshing {
            return Err(LifecycleError::InvalidTransition {
                from: inner.phase,
                action: "finish refresh",
            });
        }
        if let Some(document) = updated {
            inner.active = Some(document);
        }
        inner.phase = EnrollmentPhase::Enrolled;
        Ok(())
    }

    /// Returns the current phase.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Poisoned`] when the lock is poisoned.
    pub fn phase(&self) -> Result<EnrollmentPhase, LifecycleError> {
        Ok(self.lock()?.phase)
    }

    /// Returns the active configuration document, when resolved.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Poisoned`] when the lock is poisoned.
    pub fn active_document(&self) -> Result<Option<AgentConfigDocument>, LifecycleError> {
        Ok(self.lock()?.active.clone())
    }

    /// Returns the provenance of the active document.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Poisoned`] when the lock is poisoned.
    pub fn provenance(&self) -> Result<Option<SourceKind>, LifecycleError> {
        Ok(self.lock()?.provenance)
    }

    /// Returns a handle to the credential holder for this enrollment.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Poisoned`] when the lock is poisoned.
    pub fn credentials(&self) -> Result<Arc<CredentialHolder>, LifecycleError> {
        Ok(Arc::clone(&self.lock()?.credentials))
    }

    /// Returns the terminal failure reason, when failed.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Poisoned`] when the lock is poisoned.
    pub fn failure_reason(&self) -> Result<Option<String>, LifecycleError> {
        Ok(self.lock()?.failure.clone())
    }

    /// Locks the inner state, mapping poisoning to an error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LifecycleInner>, LifecycleError> {
        self.inner.lock().map_err(|_| LifecycleError::Poisoned)
    }
}
