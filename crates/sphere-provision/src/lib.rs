// crates/sphere-provision/src/lib.rs
// ============================================================================
// Module: Sphere Provision Library
// Description: Environment catalog and per-device config generation.
// Purpose: Turn environment definitions plus device identity into artifacts.
// Dependencies: sphere-config-core, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! Sphere Provision is the operator-side half of the provisioning pipeline:
//! an immutable environment catalog loaded from JSON definitions, and a
//! deterministic generator that merges one catalog entry with per-device
//! identity into a validated [`sphere_config_core::AgentConfigDocument`].
//! Generation fails closed; an invalid merge result is never emitted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod generator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::CatalogError;
pub use catalog::CatalogHandle;
pub use catalog::EnvironmentCatalog;
pub use catalog::EnvironmentDefinition;
pub use generator::BatchRequest;
pub use generator::GenerateError;
pub use generator::artifact_file_name;
pub use generator::generate;
pub use generator::generate_at;
pub use generator::generate_batch;
