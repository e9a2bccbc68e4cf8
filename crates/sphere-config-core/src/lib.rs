// crates/sphere-config-core/src/lib.rs
// ============================================================================
// Module: Sphere Config Core Library
// Description: Canonical agent-config document model for Sphere provisioning.
// Purpose: Define the config artifact, its validator, and credential types.
// Dependencies: serde, serde_json, thiserror, time, url
// ============================================================================

//! ## Overview
//! Sphere Config Core defines the `sphere-agent-config.json` document model
//! shared by the provisioning (generator) side and the device (resolver)
//! side, the violation-accumulating schema validator, the published JSON
//! schema, and the enrollment credential lifecycle types. Everything here is
//! pure data and validation; no I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod document;
pub mod enroll;
pub mod identity;
pub mod schema;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use document::ARTIFACT_FILE_NAME;
pub use document::AgentConfigDocument;
pub use document::EnvironmentName;
pub use document::FeatureFlags;
pub use document::SCHEMA_VERSION;
pub use document::now_rfc3339;
pub use enroll::CredentialError;
pub use enroll::CredentialHolder;
pub use enroll::CredentialState;
pub use enroll::EnrollmentKey;
pub use enroll::EnrollmentKeyError;
pub use enroll::SessionToken;
pub use identity::DeviceIdentity;
pub use schema::document_schema;
pub use validate::ENROLLMENT_KEY_PREFIX;
pub use validate::ValidationReport;
pub use validate::Violation;
pub use validate::validate_document;
