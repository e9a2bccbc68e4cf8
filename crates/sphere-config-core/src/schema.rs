// crates/sphere-config-core/src/schema.rs
// ============================================================================
// Module: Sphere Config Schema
// Description: JSON Schema emission for the agent-config document.
// Purpose: Publish a machine-readable contract for external tooling.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The generated artifact is consumed by provisioning tools written in other
//! languages, so the document contract is also published as JSON Schema
//! (draft 2020-12). The schema mirrors the checks in
//! [`crate::validate_document`]; the environment-conditional HTTPS rule
//! cannot be expressed structurally and remains validator-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::document::SCHEMA_VERSION;

// ============================================================================
// SECTION: Schema Emission
// ============================================================================

/// Returns the JSON Schema for [`crate::AgentConfigDocument`].
#[must_use]
pub fn document_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sphere-agent-config",
        "type": "object",
        "additionalProperties": false,
        "required": [
            "schema_version",
            "environment",
            "server_url",
            "ws_path",
            "enrollment_api_key",
            "device_id",
            "workstation_id",
            "instance_index",
            "location",
            "config_poll_interval_seconds",
            "features",
            "meta",
            "generated_at"
        ],
        "properties": {
            "schema_version": { "type": "integer", "const": SCHEMA_VERSION },
            "environment": { "type": "string", "minLength": 1 },
            "server_url": { "type": "string", "format": "uri", "minLength": 1 },
            "ws_path": { "type": "string", "pattern": "^/" },
            "enrollment_api_key": { "type": "string", "pattern": "^sphr_enroll_.+" },
            "device_id": { "type": ["string", "null"] },
            "workstation_id": { "type": "string", "minLength": 1 },
            "instance_index": { "type": "integer", "minimum": 0 },
            "location": { "type": "string", "minLength": 1 },
            "config_poll_interval_seconds": { "type": "integer", "minimum": 1 },
            "features": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "telemetry_enabled": { "type": "boolean" },
                    "streaming_enabled": { "type": "boolean" },
                    "ota_enabled": { "type": "boolean" },
                    "auto_register": { "type": "boolean" }
                }
            },
            "meta": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            },
            "generated_at": { "type": "string", "format": "date-time" }
        }
    })
}
