// crates/sphere-agent-resolver/src/lib.rs
// ============================================================================
// Module: Sphere Agent Resolver Library
// Description: Device-side config discovery, enrollment lifecycle, refresh.
// Purpose: Pick one authoritative config source and manage enrollment state.
// Dependencies: sphere-config-core, reqwest, thiserror, url
// ============================================================================

//! ## Overview
//! The resolver runs on the device at boot: it probes an ordered chain of
//! candidate config sources, returns the first one that is present and
//! validates, and records a provenance tag plus a per-candidate audit trail.
//! Around it sit the enrollment lifecycle state machine (key exchange, JWT
//! custody, credential erasure) and the daily refresh cycle against the
//! backend config endpoint.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod candidate;
pub mod lifecycle;
pub mod probes;
pub mod refresh;
pub mod resolver;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use candidate::CandidateProbe;
pub use candidate::ConfigSourceCandidate;
pub use candidate::MAX_CANDIDATE_BYTES;
pub use candidate::ProbeError;
pub use candidate::SourceKind;
pub use candidate::TrustLevel;
pub use lifecycle::EnrollmentLifecycle;
pub use lifecycle::EnrollmentPhase;
pub use lifecycle::LifecycleError;
pub use probes::FileProbe;
pub use probes::FixedProbe;
pub use probes::HttpProbe;
pub use refresh::CONFIG_ENDPOINT_PATH;
pub use refresh::ConfigFetcher;
pub use refresh::FetchError;
pub use refresh::HttpConfigFetcher;
pub use refresh::RefreshOutcome;
pub use refresh::RefreshPolicy;
pub use refresh::run_refresh;
pub use resolver::CandidateDisposition;
pub use resolver::CandidateOutcome;
pub use resolver::Resolution;
pub use resolver::ResolveError;
pub use resolver::resolve;
