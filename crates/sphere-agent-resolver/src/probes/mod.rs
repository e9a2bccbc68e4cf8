// crates/sphere-agent-resolver/src/probes/mod.rs
// ============================================================================
// Module: Sphere Candidate Probes
// Description: Reference probe implementations for the discovery chain.
// Purpose: Read candidate bytes from files, HTTP endpoints, and memory.
// Dependencies: reqwest, url, std
// ============================================================================

//! ## Overview
//! Three probe implementations cover the discovery chain: [`FileProbe`] for
//! the filesystem-backed sources, [`HttpProbe`] for the network endpoint,
//! and [`FixedProbe`] for in-memory payloads (managed-config snapshots
//! handed over by the platform, and compiled-in defaults). Sources with
//! bespoke read mechanics, such as the encrypted local store, implement
//! [`crate::CandidateProbe`] in their own layer.

// ============================================================================
// SECTION: Implementations
// ============================================================================

pub mod file;
pub mod fixed;
pub mod http;

pub use file::FileProbe;
pub use fixed::FixedProbe;
pub use http::HttpProbe;
