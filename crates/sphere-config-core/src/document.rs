// crates/sphere-config-core/src/document.rs
// ============================================================================
// Module: Sphere Agent Config Document
// Description: The generated configuration artifact consumed by devices.
// Purpose: Provide a stable, deterministic wire form for agent configs.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! `AgentConfigDocument` is the single artifact produced by generation and
//! consumed by the device at its well-known path
//! (`sphere-agent-config.json`). Field order is fixed by declaration order
//! and all maps are `BTreeMap`, so two documents built from the same inputs
//! serialize byte-identically apart from `generated_at`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Current agent-config document schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Well-known artifact file name consumed by the device agent.
pub const ARTIFACT_FILE_NAME: &str = "sphere-agent-config.json";

/// Default WebSocket path for the agent control channel.
pub const DEFAULT_WS_PATH: &str = "/ws/android";

/// Default backend config poll interval (once per day).
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 86_400;

/// Marker stored in `meta.clone_source` for batch-generated clone configs.
pub const CLONE_SOURCE_AUTO: &str = "auto-generated";

// ============================================================================
// SECTION: Environment Name
// ============================================================================

/// Deployment environment name.
///
/// # Invariants
/// - Serializes as a plain string; unknown names round-trip via `Other`.
/// - Only `Development` relaxes the HTTPS requirement; `Other` names are
///   treated like production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnvironmentName {
    /// Production fleet.
    Production,
    /// Staging fleet.
    Staging,
    /// Local development (HTTP permitted).
    Development,
    /// Operator-defined environment name.
    Other(String),
}

impl EnvironmentName {
    /// Returns the wire form of the environment name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Returns true when HTTP (non-TLS) server URLs are permitted.
    #[must_use]
    pub const fn allows_insecure_http(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl From<&str> for EnvironmentName {
    fn from(name: &str) -> Self {
        match name {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EnvironmentName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EnvironmentName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}

// ============================================================================
// SECTION: Feature Flags
// ============================================================================

/// Returns the default value for individual feature flags.
const fn default_true() -> bool {
    true
}

/// Agent feature toggles carried in the config artifact.
///
/// # Invariants
/// - All flags default to enabled; absent flags deserialize as `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Device telemetry reporting.
    #[serde(default = "default_true")]
    pub telemetry_enabled: bool,
    /// Screen streaming channel.
    #[serde(default = "default_true")]
    pub streaming_enabled: bool,
    /// Over-the-air agent updates.
    #[serde(default = "default_true")]
    pub ota_enabled: bool,
    /// Automatic registration on first boot.
    #[serde(default = "default_true")]
    pub auto_register: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            telemetry_enabled: true,
            streaming_enabled: true,
            ota_enabled: true,
            auto_register: true,
        }
    }
}

// ============================================================================
// SECTION: Agent Config Document
// ============================================================================

/// The per-device configuration artifact.
///
/// # Invariants
/// - Instances are usable only after passing [`crate::validate_document`].
/// - `server_url` scheme must be `https` unless `environment` is
///   development.
/// - Immutable once emitted; refresh supersedes, never mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfigDocument {
    /// Document schema version ([`SCHEMA_VERSION`]).
    pub schema_version: u32,
    /// Environment this document was generated for.
    pub environment: EnvironmentName,
    /// Control-plane endpoint URL.
    pub server_url: String,
    /// WebSocket path appended to `server_url` for the control channel.
    pub ws_path: String,
    /// Enrollment key, scope `device:register` only (`sphr_enroll_*`).
    pub enrollment_api_key: String,
    /// Backend-assigned device identifier; always null at generation time.
    pub device_id: Option<String>,
    /// Stable identifier of the physical host or farm slot.
    pub workstation_id: String,
    /// Clone instance index, unique within a workstation.
    pub instance_index: u32,
    /// Deployment location label.
    pub location: String,
    /// Backend config poll interval in seconds.
    pub config_poll_interval_seconds: u64,
    /// Agent feature toggles.
    pub features: FeatureFlags,
    /// Free-form metadata (emulator instance name, clone source).
    pub meta: BTreeMap<String, String>,
    /// RFC 3339 UTC generation timestamp.
    pub generated_at: String,
}

impl AgentConfigDocument {
    /// Serializes the document to pretty JSON for the on-device artifact.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when serialization fails.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a document from raw JSON bytes without validating it.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] when the bytes are not a well-formed
    /// document.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns true when `other` carries the same configuration apart from
    /// its generation timestamp. Used by the refresh cycle for change
    /// detection.
    #[must_use]
    pub fn same_parameters(&self, other: &Self) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.generated_at = String::new();
        b.generated_at = String::new();
        a == b
    }
}

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Returns the current UTC time as an RFC 3339 string.
///
/// # Errors
///
/// Returns a [`time::error::Format`] error when formatting fails.
pub fn now_rfc3339() -> Result<String, time::error::Format> {
    OffsetDateTime::now_utc().format(&Rfc3339)
}
