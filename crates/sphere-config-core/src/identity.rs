// crates/sphere-config-core/src/identity.rs
// ============================================================================
// Module: Sphere Device Identity
// Description: Per-device identity parameters supplied at generation time.
// Purpose: Carry workstation, instance, and override inputs for generation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! `DeviceIdentity` bundles the parameters that distinguish one device (or
//! one cloned emulator instance) from another. Overrides are applied last by
//! the generator, as shallow whole-field replacements keyed by document
//! field name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Device Identity
// ============================================================================

/// Identity parameters for a single device or cloned emulator instance.
///
/// # Invariants
/// - `instance_index` is unique within a workstation for cloned instances.
/// - `overrides` keys name document fields; values replace the whole field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Stable identifier of the physical host or farm slot.
    pub workstation_id: String,
    /// Clone instance index (0-based).
    pub instance_index: u32,
    /// Deployment location label; falls back to the environment default.
    pub location: Option<String>,
    /// Emulator instance name recorded in document metadata.
    pub ldplayer_name: Option<String>,
    /// Field overrides applied after environment and identity merging.
    #[serde(default)]
    pub overrides: BTreeMap<String, Value>,
}

impl DeviceIdentity {
    /// Creates an identity with the given workstation and instance index.
    #[must_use]
    pub fn new(workstation_id: impl Into<String>, instance_index: u32) -> Self {
        Self {
            workstation_id: workstation_id.into(),
            instance_index,
            location: None,
            ldplayer_name: None,
            overrides: BTreeMap::new(),
        }
    }

    /// Sets the location label.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the emulator instance name.
    #[must_use]
    pub fn with_ldplayer_name(mut self, name: impl Into<String>) -> Self {
        self.ldplayer_name = Some(name.into());
        self
    }

    /// Adds a single field override.
    #[must_use]
    pub fn with_override(mut self, field: impl Into<String>, value: Value) -> Self {
        self.overrides.insert(field.into(), value);
        self
    }
}
