// crates/sphere-provision/src/generator.rs
// ============================================================================
// Module: Sphere Config Generator
// Description: Deterministic merge of environment base and device identity.
// Purpose: Emit validated agent-config documents, failing closed on any violation.
// Dependencies: sphere-config-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Generation layers three inputs in fixed order: environment base fields,
//! device-identity fields, then field overrides (shallow whole-field
//! replace). Overrides can never change the `environment` field or bypass
//! the HTTPS rule because the merged result is validated as a whole before
//! anything is emitted. Given the same catalog snapshot, identity, and
//! overrides, output is byte-identical apart from `generated_at`; callers
//! can inject the timestamp via [`generate_at`] for reproducible artifacts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;
use sphere_config_core::ARTIFACT_FILE_NAME;
use sphere_config_core::AgentConfigDocument;
use sphere_config_core::DeviceIdentity;
use sphere_config_core::EnvironmentName;
use sphere_config_core::FeatureFlags;
use sphere_config_core::SCHEMA_VERSION;
use sphere_config_core::ValidationReport;
use sphere_config_core::Violation;
use sphere_config_core::document::CLONE_SOURCE_AUTO;
use sphere_config_core::now_rfc3339;
use sphere_config_core::validate_document;
use thiserror::Error;

use crate::catalog::EnvironmentCatalog;
use crate::catalog::EnvironmentDefinition;

// ============================================================================
// SECTION: Generator Errors
// ============================================================================

/// Errors produced by config generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Requested environment is absent from the catalog.
    #[error("unknown environment: {name}")]
    UnknownEnvironment {
        /// Requested environment name.
        name: String,
    },
    /// Merged document failed validation; nothing was emitted.
    #[error("generated document failed validation: {report}")]
    Invalid {
        /// Full violation list for the merged document.
        report: ValidationReport,
    },
    /// Generation timestamp could not be produced.
    #[error("timestamp formatting failed: {0}")]
    Timestamp(String),
    /// Batch indices would exceed the instance index range.
    #[error("batch of {count} starting at {start_index} exceeds the instance index range")]
    BatchRange {
        /// Requested first instance index.
        start_index: u32,
        /// Requested document count.
        count: u32,
    },
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Generates a validated document, stamping the current UTC time.
///
/// # Errors
///
/// Returns [`GenerateError`] when the environment is unknown, the merged
/// document fails validation, or the timestamp cannot be formatted.
pub fn generate(
    catalog: &EnvironmentCatalog,
    environment: &EnvironmentName,
    identity: &DeviceIdentity,
) -> Result<AgentConfigDocument, GenerateError> {
    let generated_at = now_rfc3339().map_err(|err| GenerateError::Timestamp(err.to_string()))?;
    generate_at(catalog, environment, identity, &generated_at)
}

/// Generates a validated document with a caller-supplied timestamp.
///
/// # Errors
///
/// Returns [`GenerateError`] when the environment is unknown or the merged
/// document fails validation.
pub fn generate_at(
    catalog: &EnvironmentCatalog,
    environment: &EnvironmentName,
    identity: &DeviceIdentity,
    generated_at: &str,
) -> Result<AgentConfigDocument, GenerateError> {
    let definition = catalog.get(environment).ok_or_else(|| GenerateError::UnknownEnvironment {
        name: environment.as_str().to_string(),
    })?;

    let mut document = base_document(definition, identity, generated_at);
    let mut report = ValidationReport::new();
    apply_overrides(&mut document, &identity.overrides, &mut report);

    for violation in validate_document(&document).into_violations() {
        report.push(violation);
    }
    if report.is_valid() {
        Ok(document)
    } else {
        Err(GenerateError::Invalid {
            report,
        })
    }
}

/// Builds the pre-override document from environment and identity fields.
fn base_document(
    definition: &EnvironmentDefinition,
    identity: &DeviceIdentity,
    generated_at: &str,
) -> AgentConfigDocument {
    let mut meta = BTreeMap::new();
    if let Some(name) = &identity.ldplayer_name {
        meta.insert("ldplayer_name".to_string(), name.clone());
    }
    if !identity.workstation_id.is_empty() {
        meta.insert("clone_source".to_string(), CLONE_SOURCE_AUTO.to_string());
    }
    AgentConfigDocument {
        schema_version: SCHEMA_VERSION,
        environment: definition.environment.clone(),
        server_url: definition.server_url.clone(),
        ws_path: definition.ws_path.clone(),
        enrollment_api_key: definition.enrollment_api_key.clone(),
        device_id: None,
        workstation_id: identity.workstation_id.clone(),
        instance_index: identity.instance_index,
        location: identity
            .location
            .clone()
            .or_else(|| definition.location.clone())
            .unwrap_or_default(),
        config_poll_interval_seconds: definition.config_poll_interval_seconds,
        features: definition.features,
        meta,
        generated_at: generated_at.to_string(),
    }
}

/// Applies overrides last, field by field, as shallow whole-field replaces.
///
/// Overrides may never change `environment` (identity confusion) or the
/// stamped fields; unknown keys and mistyped values are recorded as
/// violations and left unapplied.
fn apply_overrides(
    document: &mut AgentConfigDocument,
    overrides: &BTreeMap<String, Value>,
    report: &mut ValidationReport,
) {
    for (field, value) in overrides {
        match field.as_str() {
            "environment" => {
                // Restating the requested environment is a no-op; anything
                // else is identity confusion.
                if value.as_str() != Some(document.environment.as_str()) {
                    report.push(Violation::ForbiddenOverride {
                        field: field.clone(),
                    });
                }
            }
            "schema_version" | "generated_at" | "device_id" => {
                report.push(Violation::ForbiddenOverride {
                    field: field.clone(),
                });
            }
            "server_url" => apply_string(field, value, &mut document.server_url, report),
            "ws_path" => apply_string(field, value, &mut document.ws_path, report),
            "enrollment_api_key" => {
                apply_string(field, value, &mut document.enrollment_api_key, report);
            }
            "workstation_id" => apply_string(field, value, &mut document.workstation_id, report),
            "location" => apply_string(field, value, &mut document.location, report),
            "instance_index" => {
                match value.as_u64().and_then(|raw| u32::try_from(raw).ok()) {
                    Some(index) => document.instance_index = index,
                    None => report.push(Violation::InvalidOverrideValue {
                        field: field.clone(),
                    }),
                }
            }
            "config_poll_interval_seconds" => match value.as_u64() {
                Some(seconds) => document.config_poll_interval_seconds = seconds,
                None => report.push(Violation::InvalidOverrideValue {
                    field: field.clone(),
                }),
            },
            "features" => match serde_json::from_value::<FeatureFlags>(value.clone()) {
                Ok(features) => document.features = features,
                Err(_) => report.push(Violation::InvalidOverrideValue {
                    field: field.clone(),
                }),
            },
            "meta" => match serde_json::from_value::<BTreeMap<String, String>>(value.clone()) {
                Ok(meta) => document.meta = meta,
                Err(_) => report.push(Violation::InvalidOverrideValue {
                    field: field.clone(),
                }),
            },
            _ => report.push(Violation::UnknownOverrideField {
                field: field.clone(),
            }),
        }
    }
}

/// Replaces a string field from an override value, recording type errors.
fn apply_string(field: &str, value: &Value, slot: &mut String, report: &mut ValidationReport) {
    match value.as_str() {
        Some(text) => *slot = text.to_string(),
        None => report.push(Violation::InvalidOverrideValue {
            field: field.to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Batch Generation
// ============================================================================

/// Parameters for batch generation over one workstation.
///
/// # Invariants
/// - `count >= 1`; indices run from `start_index` upward without gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRequest {
    /// Number of documents to generate.
    pub count: u32,
    /// First instance index in the batch.
    pub start_index: u32,
}

/// Generates a batch of documents for cloned emulator instances.
///
/// Instances without an explicit emulator name are labelled `Farm-NNN`.
/// Fails closed on the first invalid document; no partial batch is returned.
///
/// # Errors
///
/// Returns [`GenerateError`] from the first failing generation, or
/// [`GenerateError::BatchRange`] when the indices would wrap around.
pub fn generate_batch(
    catalog: &EnvironmentCatalog,
    environment: &EnvironmentName,
    identity: &DeviceIdentity,
    batch: BatchRequest,
) -> Result<Vec<AgentConfigDocument>, GenerateError> {
    batch
        .start_index
        .checked_add(batch.count.saturating_sub(1))
        .ok_or(GenerateError::BatchRange {
            start_index: batch.start_index,
            count: batch.count,
        })?;
    let mut documents = Vec::with_capacity(batch.count as usize);
    for offset in 0..batch.count {
        let index = batch.start_index + offset;
        let mut instance = identity.clone();
        instance.instance_index = index;
        if batch.count > 1 && instance.ldplayer_name.is_none() {
            instance.ldplayer_name = Some(format!("Farm-{index:03}"));
        }
        documents.push(generate(catalog, environment, &instance)?);
    }
    Ok(documents)
}

// ============================================================================
// SECTION: Artifact Naming
// ============================================================================

/// Returns the artifact file name for a single or batch-generated document.
#[must_use]
pub fn artifact_file_name(batch_index: Option<u32>) -> String {
    batch_index.map_or_else(
        || ARTIFACT_FILE_NAME.to_string(),
        |index| format!("sphere-agent-config-{index:03}.json"),
    )
}
