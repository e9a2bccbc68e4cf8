// crates/sphere-agent-resolver/src/probes/fixed.rs
// ============================================================================
// Module: Sphere Fixed Probe
// Description: In-memory candidate probe for snapshot-backed sources.
// Purpose: Serve managed-config snapshots and compiled-in defaults.
// Dependencies: std
// ============================================================================

//! ## Overview
//! `FixedProbe` serves bytes that are already in memory: a managed-config
//! snapshot handed over by the platform's restrictions API, or the defaults
//! compiled into the agent. An absent snapshot reads as
//! [`ProbeError::NotFound`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::candidate::CandidateProbe;
use crate::candidate::ProbeError;
use crate::candidate::enforce_max_bytes;

// ============================================================================
// SECTION: Fixed Probe
// ============================================================================

/// In-memory candidate probe.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    /// Payload bytes, absent when the source has nothing to offer.
    bytes: Option<Vec<u8>>,
}

impl FixedProbe {
    /// Creates a probe that serves the given payload.
    #[must_use]
    pub fn present(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    /// Creates a probe for a source that is currently absent.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            bytes: None,
        }
    }
}

impl CandidateProbe for FixedProbe {
    fn read(&self) -> Result<Vec<u8>, ProbeError> {
        let bytes = self.bytes.as_ref().ok_or(ProbeError::NotFound)?;
        enforce_max_bytes(bytes.len())?;
        Ok(bytes.clone())
    }
}
