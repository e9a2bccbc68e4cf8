//! JSON Schema tests for sphere-config-core.
// crates/sphere-config-core/tests/schema_validation.rs
// =============================================================================
// Module: Schema Validation Tests
// Description: Tests for the published agent-config JSON schema.
// Purpose: Ensure the emitted schema matches the document model and validator.
// =============================================================================

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use serde_json::json;
use sphere_config_core::document_schema;

type TestResult = Result<(), String>;

fn compile_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| format!("failed to compile schema: {err}"))
}

fn sample_document_json() -> Value {
    json!({
        "schema_version": 1,
        "environment": "production",
        "server_url": "https://control.sphere.example",
        "ws_path": "/ws/android",
        "enrollment_api_key": "sphr_enroll_abc123",
        "device_id": null,
        "workstation_id": "ws-PC-FARM-01",
        "instance_index": 42,
        "location": "msk-office-1",
        "config_poll_interval_seconds": 86400,
        "features": {
            "telemetry_enabled": true,
            "streaming_enabled": true,
            "ota_enabled": true,
            "auto_register": true
        },
        "meta": {},
        "generated_at": "2026-08-27T10:00:00Z"
    })
}

#[test]
fn schema_compiles_as_draft_2020_12() -> TestResult {
    compile_schema(&document_schema())?;
    Ok(())
}

#[test]
fn schema_accepts_generated_document_shape() -> TestResult {
    let validator = compile_schema(&document_schema())?;
    let document = sample_document_json();
    if validator.is_valid(&document) {
        Ok(())
    } else {
        Err("schema rejected a canonical generated document".to_string())
    }
}

#[test]
fn schema_requires_all_artifact_fields() -> TestResult {
    let schema = document_schema();
    let required = schema
        .pointer("/required")
        .and_then(Value::as_array)
        .ok_or_else(|| "schema missing required list".to_string())?;
    for field in [
        "schema_version",
        "environment",
        "server_url",
        "enrollment_api_key",
        "workstation_id",
        "instance_index",
        "location",
        "generated_at",
    ] {
        if !required.iter().any(|value| value == field) {
            return Err(format!("schema does not require field: {field}"));
        }
    }
    Ok(())
}

#[test]
fn schema_rejects_mis_prefixed_enrollment_key() -> TestResult {
    let validator = compile_schema(&document_schema())?;
    let mut document = sample_document_json();
    document["enrollment_api_key"] = json!("sk_live_wrong");
    if validator.is_valid(&document) {
        Err("schema accepted a mis-prefixed enrollment key".to_string())
    } else {
        Ok(())
    }
}

#[test]
fn schema_rejects_negative_instance_index() -> TestResult {
    let validator = compile_schema(&document_schema())?;
    let mut document = sample_document_json();
    document["instance_index"] = json!(-1);
    if validator.is_valid(&document) {
        Err("schema accepted a negative instance index".to_string())
    } else {
        Ok(())
    }
}

#[test]
fn schema_rejects_unknown_fields() -> TestResult {
    let validator = compile_schema(&document_schema())?;
    let mut document = sample_document_json();
    document["extra_field"] = json!("surprise");
    if validator.is_valid(&document) {
        Err("schema accepted an unknown top-level field".to_string())
    } else {
        Ok(())
    }
}
