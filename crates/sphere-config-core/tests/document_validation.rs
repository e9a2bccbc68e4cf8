//! Document validation tests for sphere-config-core.
// crates/sphere-config-core/tests/document_validation.rs
// =============================================================================
// Module: Document Validation Tests
// Description: Validator coverage for required fields, schemes, and key format.
// Purpose: Ensure every violation is reported and valid documents pass clean.
// =============================================================================

use sphere_config_core::AgentConfigDocument;
use sphere_config_core::EnvironmentName;
use sphere_config_core::FeatureFlags;
use sphere_config_core::SCHEMA_VERSION;
use sphere_config_core::Violation;
use sphere_config_core::validate_document;

type TestResult = Result<(), String>;

fn sample_document() -> AgentConfigDocument {
    AgentConfigDocument {
        schema_version: SCHEMA_VERSION,
        environment: EnvironmentName::Production,
        server_url: "https://control.sphere.example".to_string(),
        ws_path: "/ws/android".to_string(),
        enrollment_api_key: "sphr_enroll_abc123".to_string(),
        device_id: None,
        workstation_id: "ws-PC-FARM-01".to_string(),
        instance_index: 42,
        location: "msk-office-1".to_string(),
        config_poll_interval_seconds: 86_400,
        features: FeatureFlags::default(),
        meta: std::collections::BTreeMap::new(),
        generated_at: "2026-08-27T10:00:00Z".to_string(),
    }
}

fn assert_has_violation(document: &AgentConfigDocument, needle: &str) -> TestResult {
    let report = validate_document(document);
    if report.is_valid() {
        return Err(format!("expected violation containing {needle}, report was valid"));
    }
    let rendered = report.to_string();
    if rendered.contains(needle) {
        Ok(())
    } else {
        Err(format!("report {rendered} did not contain {needle}"))
    }
}

#[test]
fn valid_production_document_passes() -> TestResult {
    let report = validate_document(&sample_document());
    if report.is_valid() {
        Ok(())
    } else {
        Err(format!("expected valid document, got: {report}"))
    }
}

#[test]
fn http_rejected_outside_development() -> TestResult {
    let mut document = sample_document();
    document.server_url = "http://control.sphere.example".to_string();
    assert_has_violation(&document, "must use https")
}

#[test]
fn http_permitted_in_development() -> TestResult {
    let mut document = sample_document();
    document.environment = EnvironmentName::Development;
    document.server_url = "http://10.0.2.2:8080".to_string();
    let report = validate_document(&document);
    if report.is_valid() {
        Ok(())
    } else {
        Err(format!("development http should validate, got: {report}"))
    }
}

#[test]
fn custom_environment_requires_https() -> TestResult {
    let mut document = sample_document();
    document.environment = EnvironmentName::from("qa-eu");
    document.server_url = "http://qa.sphere.example".to_string();
    assert_has_violation(&document, "must use https")
}

#[test]
fn non_http_scheme_rejected() -> TestResult {
    let mut document = sample_document();
    document.server_url = "ftp://control.sphere.example".to_string();
    assert_has_violation(&document, "unsupported scheme")
}

#[test]
fn unparseable_server_url_rejected() -> TestResult {
    let mut document = sample_document();
    document.server_url = "not a url".to_string();
    assert_has_violation(&document, "not a valid uri")
}

#[test]
fn enrollment_key_prefix_enforced() -> TestResult {
    let mut document = sample_document();
    document.enrollment_api_key = "sk_live_wrong".to_string();
    assert_has_violation(&document, "sphr_enroll_")
}

#[test]
fn bare_prefix_key_rejected() -> TestResult {
    let mut document = sample_document();
    document.enrollment_api_key = "sphr_enroll_".to_string();
    assert_has_violation(&document, "sphr_enroll_")
}

#[test]
fn empty_key_reported_as_missing() -> TestResult {
    let mut document = sample_document();
    document.enrollment_api_key = String::new();
    assert_has_violation(&document, "enrollment_api_key")
}

#[test]
fn unsupported_schema_version_rejected() -> TestResult {
    let mut document = sample_document();
    document.schema_version = 99;
    assert_has_violation(&document, "unsupported schema_version")
}

#[test]
fn zero_poll_interval_rejected() -> TestResult {
    let mut document = sample_document();
    document.config_poll_interval_seconds = 0;
    assert_has_violation(&document, "config_poll_interval_seconds")
}

#[test]
fn relative_ws_path_rejected() -> TestResult {
    let mut document = sample_document();
    document.ws_path = "ws/android".to_string();
    assert_has_violation(&document, "absolute path")
}

#[test]
fn malformed_generated_at_rejected() -> TestResult {
    let mut document = sample_document();
    document.generated_at = "yesterday".to_string();
    assert_has_violation(&document, "generated_at")
}

#[test]
fn all_violations_reported_together() -> TestResult {
    let mut document = sample_document();
    document.server_url = String::new();
    document.enrollment_api_key = String::new();
    document.workstation_id = String::new();
    document.location = String::new();
    let report = validate_document(&document);
    let count = report.violations().len();
    if count >= 4 {
        Ok(())
    } else {
        Err(format!("expected at least 4 violations, got {count}: {report}"))
    }
}

#[test]
fn missing_field_violation_is_structured() -> TestResult {
    let mut document = sample_document();
    document.workstation_id = String::new();
    let report = validate_document(&document);
    let expected = Violation::MissingField {
        field: "workstation_id",
    };
    if report.violations().contains(&expected) {
        Ok(())
    } else {
        Err(format!("expected structured missing-field violation, got: {report}"))
    }
}

#[test]
fn serialization_is_deterministic() -> TestResult {
    let document = sample_document();
    let first = document.to_json_string().map_err(|err| err.to_string())?;
    let second = document.clone().to_json_string().map_err(|err| err.to_string())?;
    if first == second {
        Ok(())
    } else {
        Err("identical documents serialized differently".to_string())
    }
}

#[test]
fn same_parameters_ignores_timestamp() -> TestResult {
    let document = sample_document();
    let mut refreshed = document.clone();
    refreshed.generated_at = "2026-08-28T10:00:00Z".to_string();
    if !document.same_parameters(&refreshed) {
        return Err("timestamp-only difference should compare equal".to_string());
    }
    let mut moved = document.clone();
    moved.server_url = "https://eu.sphere.example".to_string();
    if document.same_parameters(&moved) {
        return Err("server_url change should compare unequal".to_string());
    }
    Ok(())
}
