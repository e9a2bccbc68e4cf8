// crates/sphere-agent-resolver/src/resolver.rs
// ============================================================================
// Module: Sphere Config Resolver
// Description: Ordered scan over the candidate discovery chain.
// Purpose: Pick exactly one authoritative config source, first valid wins.
// Dependencies: sphere-config-core
// ============================================================================

//! ## Overview
//! Resolution is one bounded pass over the candidate list in strict rank
//! order. The first candidate that is both present and passes schema
//! validation wins; later candidates are never consulted, even if a
//! higher-trust source sits further down. A candidate that is present but
//! corrupt or invalid is recorded in the audit trail and skipped. Only total
//! exhaustion surfaces as an error, carrying the full trail so the caller
//! can log what was tried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use sphere_config_core::AgentConfigDocument;
use sphere_config_core::validate_document;
use thiserror::Error;

use crate::candidate::ConfigSourceCandidate;
use crate::candidate::ProbeError;
use crate::candidate::SourceKind;

// ============================================================================
// SECTION: Audit Records
// ============================================================================

/// Outcome of probing one candidate.
///
/// # Invariants
/// - Descriptions never echo credential material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateDisposition {
    /// Candidate supplied the authoritative document.
    Selected,
    /// Source is absent.
    Missing,
    /// Source is present but could not be read.
    ReadFailed {
        /// Probe failure description.
        reason: String,
    },
    /// Source payload was not a well-formed document.
    Corrupt {
        /// Decode failure description.
        reason: String,
    },
    /// Document parsed but failed schema validation.
    Invalid {
        /// Rendered violation list.
        violations: String,
    },
}

/// Audit record for one probed candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome {
    /// Source kind that was probed.
    pub kind: SourceKind,
    /// What happened when it was probed.
    pub disposition: CandidateDisposition,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// A successful resolution: the document, where it came from, and the trail.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The authoritative configuration document.
    pub document: AgentConfigDocument,
    /// Provenance tag of the winning source.
    pub provenance: SourceKind,
    /// Audit trail covering every candidate probed this pass.
    pub audit: Vec<CandidateOutcome>,
}

/// Errors produced by a resolution pass.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every candidate was missing, unreadable, or invalid.
    #[error("no candidate source yielded a valid configuration")]
    NoConfigFound {
        /// Audit trail covering every candidate probed.
        audit: Vec<CandidateOutcome>,
    },
    /// Candidate list violated the strict rank order.
    #[error(
        "candidates out of order: {prev} must precede {nxt}",
        prev = .previous.as_str(),
        nxt = .next.as_str()
    )]
    UnorderedCandidates {
        /// Kind that appeared first.
        previous: SourceKind,
        /// Kind that must not follow it.
        next: SourceKind,
    },
}

/// Resolves the authoritative config source from an ordered candidate list.
///
/// Probes strictly in rank order and returns on the first candidate that is
/// present and validates. Per-candidate failures are recorded, not surfaced;
/// compiled-in defaults participate only if the caller includes them as the
/// last candidate.
///
/// # Errors
///
/// Returns [`ResolveError::UnorderedCandidates`] when the list is not in
/// strictly ascending rank order, and [`ResolveError::NoConfigFound`] when
/// every candidate fails.
pub fn resolve(candidates: &[ConfigSourceCandidate]) -> Result<Resolution, ResolveError> {
    for pair in candidates.windows(2) {
        if pair[1].kind().rank() <= pair[0].kind().rank() {
            return Err(ResolveError::UnorderedCandidates {
                previous: pair[0].kind(),
                next: pair[1].kind(),
            });
        }
    }

    let mut audit = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match probe_candidate(candidate) {
            Ok(document) => {
                audit.push(CandidateOutcome {
                    kind: candidate.kind(),
                    disposition: CandidateDisposition::Selected,
                });
                return Ok(Resolution {
                    document,
                    provenance: candidate.kind(),
                    audit,
                });
            }
            Err(disposition) => {
                audit.push(CandidateOutcome {
                    kind: candidate.kind(),
                    disposition,
                });
            }
        }
    }
    Err(ResolveError::NoConfigFound {
        audit,
    })
}

/// Probes one candidate end to end: read, decode, validate.
fn probe_candidate(
    candidate: &ConfigSourceCandidate,
) -> Result<AgentConfigDocument, CandidateDisposition> {
    let bytes = candidate.read().map_err(|err| match err {
        ProbeError::NotFound => CandidateDisposition::Missing,
        other => CandidateDisposition::ReadFailed {
            reason: other.to_string(),
        },
    })?;
    let document =
        AgentConfigDocument::from_json_bytes(&bytes).map_err(|err| CandidateDisposition::Corrupt {
            reason: err.to_string(),
        })?;
    let report = validate_document(&document);
    if report.is_valid() {
        Ok(document)
    } else {
        Err(CandidateDisposition::Invalid {
            violations: report.to_string(),
        })
    }
}
