//! Enrollment lifecycle tests for sphere-agent-resolver.
// crates/sphere-agent-resolver/tests/lifecycle.rs
// =============================================================================
// Module: Lifecycle Tests
// Description: State machine transitions, credential erasure, refresh cycle.
// Purpose: Ensure enrollment phases and the refresh policy behave as specified.
// =============================================================================

use sphere_agent_resolver::ConfigSourceCandidate;
use sphere_agent_resolver::EnrollmentLifecycle;
use sphere_agent_resolver::EnrollmentPhase;
use sphere_agent_resolver::FetchError;
use sphere_agent_resolver::FixedProbe;
use sphere_agent_resolver::LifecycleError;
use sphere_agent_resolver::RefreshOutcome;
use sphere_agent_resolver::RefreshPolicy;
use sphere_agent_resolver::SourceKind;
use sphere_agent_resolver::refresh::ConfigFetcher;
use sphere_agent_resolver::resolve;
use sphere_agent_resolver::resolver::Resolution;
use sphere_config_core::AgentConfigDocument;
use sphere_config_core::SessionToken;

type TestResult = Result<(), String>;

fn valid_document_json(server_url: &str) -> String {
    format!(
        r#"{{
            "schema_version": 1,
            "environment": "production",
            "server_url": "{server_url}",
            "ws_path": "/ws/android",
            "enrollment_api_key": "sphr_enroll_abc123",
            "device_id": null,
            "workstation_id": "ws-PC-FARM-01",
            "instance_index": 42,
            "location": "msk-office-1",
            "config_poll_interval_seconds": 86400,
            "features": {{
                "telemetry_enabled": true,
                "streaming_enabled": true,
                "ota_enabled": true,
                "auto_register": true
            }},
            "meta": {{}},
            "generated_at": "2026-08-27T10:00:00Z"
        }}"#
    )
}

fn resolved(server_url: &str) -> Result<Resolution, String> {
    let candidates = vec![ConfigSourceCandidate::new(
        SourceKind::InternalStorage,
        FixedProbe::present(valid_document_json(server_url)),
    )];
    resolve(&candidates).map_err(|err| err.to_string())
}

fn enrolled_lifecycle() -> Result<EnrollmentLifecycle, String> {
    let lifecycle = EnrollmentLifecycle::new();
    lifecycle
        .begin_enrollment(resolved("https://control.sphere.example")?)
        .map_err(|err| err.to_string())?;
    lifecycle
        .complete_enrollment(SessionToken::new("jwt-token"))
        .map_err(|err| err.to_string())?;
    Ok(lifecycle)
}

/// Stub fetcher returning a canned result per call.
struct StubFetcher {
    /// Result served to the next fetch.
    result: Result<AgentConfigDocument, u16>,
}

impl ConfigFetcher for StubFetcher {
    fn fetch_current(&self, _token: &SessionToken) -> Result<AgentConfigDocument, FetchError> {
        match &self.result {
            Ok(document) => Ok(document.clone()),
            Err(status) => Err(FetchError::Status {
                status: *status,
            }),
        }
    }
}

#[test]
fn full_enrollment_path_reaches_enrolled() -> TestResult {
    let lifecycle = EnrollmentLifecycle::new();
    if lifecycle.phase().map_err(|err| err.to_string())? != EnrollmentPhase::Unenrolled {
        return Err("fresh lifecycle should be unenrolled".to_string());
    }
    let key = lifecycle
        .begin_enrollment(resolved("https://control.sphere.example")?)
        .map_err(|err| err.to_string())?;
    if key.as_str() != "sphr_enroll_abc123" {
        return Err("begin_enrollment returned wrong key".to_string());
    }
    if lifecycle.phase().map_err(|err| err.to_string())? != EnrollmentPhase::Enrolling {
        return Err("expected enrolling phase".to_string());
    }
    lifecycle
        .complete_enrollment(SessionToken::new("jwt-token"))
        .map_err(|err| err.to_string())?;
    if lifecycle.phase().map_err(|err| err.to_string())? != EnrollmentPhase::Enrolled {
        return Err("expected enrolled phase".to_string());
    }
    if lifecycle.provenance().map_err(|err| err.to_string())? != Some(SourceKind::InternalStorage) {
        return Err("provenance not recorded".to_string());
    }
    Ok(())
}

#[test]
fn enrollment_key_erased_after_completion() -> TestResult {
    let lifecycle = enrolled_lifecycle()?;
    let credentials = lifecycle.credentials().map_err(|err| err.to_string())?;
    if credentials.enrollment_key().map_err(|err| err.to_string())?.is_some() {
        return Err("enrollment key survived the exchange".to_string());
    }
    if credentials.session_token().map_err(|err| err.to_string())?.is_none() {
        return Err("session token missing after the exchange".to_string());
    }
    Ok(())
}

#[test]
fn completion_without_enrollment_rejected() -> TestResult {
    let lifecycle = EnrollmentLifecycle::new();
    match lifecycle.complete_enrollment(SessionToken::new("jwt-token")) {
        Err(LifecycleError::InvalidTransition {
            from: EnrollmentPhase::Unenrolled,
            ..
        }) => Ok(()),
        Err(err) => Err(format!("expected InvalidTransition, got {err}")),
        Ok(()) => Err("completion succeeded without enrollment".to_string()),
    }
}

#[test]
fn failed_enrollment_is_terminal_but_retryable() -> TestResult {
    let lifecycle = EnrollmentLifecycle::new();
    lifecycle.fail_enrollment("no candidate validated").map_err(|err| err.to_string())?;
    if lifecycle.phase().map_err(|err| err.to_string())? != EnrollmentPhase::EnrollmentFailed {
        return Err("expected enrollment_failed phase".to_string());
    }
    let reason = lifecycle.failure_reason().map_err(|err| err.to_string())?;
    if reason.as_deref() != Some("no candidate validated") {
        return Err("failure reason not recorded".to_string());
    }
    // Next boot / scheduled attempt may begin again from the failed state.
    lifecycle
        .begin_enrollment(resolved("https://control.sphere.example")?)
        .map_err(|err| err.to_string())?;
    if lifecycle.phase().map_err(|err| err.to_string())? != EnrollmentPhase::Enrolling {
        return Err("retry from failed state should enroll".to_string());
    }
    Ok(())
}

#[test]
fn refresh_deferred_while_enrolling() -> TestResult {
    let lifecycle = EnrollmentLifecycle::new();
    lifecycle
        .begin_enrollment(resolved("https://control.sphere.example")?)
        .map_err(|err| err.to_string())?;
    match lifecycle.begin_refresh() {
        Err(LifecycleError::RefreshDeferred) => Ok(()),
        Err(err) => Err(format!("expected RefreshDeferred, got {err}")),
        Ok(()) => Err("refresh started during enrollment".to_string()),
    }
}

#[test]
fn refresh_unchanged_leaves_document_in_place() -> TestResult {
    let lifecycle = enrolled_lifecycle()?;
    let active = lifecycle
        .active_document()
        .map_err(|err| err.to_string())?
        .ok_or_else(|| "no active document".to_string())?;
    let mut served = active.clone();
    served.generated_at = "2026-08-28T10:00:00Z".to_string();
    let fetcher = StubFetcher {
        result: Ok(served),
    };
    let outcome =
        sphere_agent_resolver::run_refresh(&lifecycle, &fetcher).map_err(|err| err.to_string())?;
    if outcome != RefreshOutcome::Unchanged {
        return Err("timestamp-only difference should be unchanged".to_string());
    }
    let after = lifecycle
        .active_document()
        .map_err(|err| err.to_string())?
        .ok_or_else(|| "active document vanished".to_string())?;
    if after != active {
        return Err("unchanged refresh replaced the active document".to_string());
    }
    Ok(())
}

#[test]
fn refresh_applies_served_parameter_change() -> TestResult {
    let lifecycle = enrolled_lifecycle()?;
    let active = lifecycle
        .active_document()
        .map_err(|err| err.to_string())?
        .ok_or_else(|| "no active document".to_string())?;
    let mut served = active.clone();
    served.server_url = "https://eu.sphere.example".to_string();
    let fetcher = StubFetcher {
        result: Ok(served),
    };
    let outcome =
        sphere_agent_resolver::run_refresh(&lifecycle, &fetcher).map_err(|err| err.to_string())?;
    if outcome != RefreshOutcome::Updated {
        return Err("server_url change should update".to_string());
    }
    let after = lifecycle
        .active_document()
        .map_err(|err| err.to_string())?
        .ok_or_else(|| "active document vanished".to_string())?;
    if after.server_url != "https://eu.sphere.example" {
        return Err("superseding document not swapped in".to_string());
    }
    if lifecycle.phase().map_err(|err| err.to_string())? != EnrollmentPhase::Enrolled {
        return Err("lifecycle should return to enrolled after refresh".to_string());
    }
    Ok(())
}

#[test]
fn refresh_failure_leaves_configuration_untouched() -> TestResult {
    let lifecycle = enrolled_lifecycle()?;
    let before = lifecycle.active_document().map_err(|err| err.to_string())?;
    let fetcher = StubFetcher {
        result: Err(503),
    };
    let outcome =
        sphere_agent_resolver::run_refresh(&lifecycle, &fetcher).map_err(|err| err.to_string())?;
    match outcome {
        RefreshOutcome::Failed {
            reason,
        } => {
            if !reason.contains("503") {
                return Err(format!("unexpected failure reason: {reason}"));
            }
        }
        _ => return Err("expected failed refresh outcome".to_string()),
    }
    let after = lifecycle.active_document().map_err(|err| err.to_string())?;
    if before != after {
        return Err("failed refresh modified the active document".to_string());
    }
    if lifecycle.phase().map_err(|err| err.to_string())? != EnrollmentPhase::Enrolled {
        return Err("lifecycle should recover to enrolled after failed refresh".to_string());
    }
    Ok(())
}

#[test]
fn refresh_policy_follows_document_interval() -> TestResult {
    let resolution = resolved("https://control.sphere.example")?;
    let policy = RefreshPolicy::from_document(&resolution.document);
    if policy.interval().as_secs() != 86_400 {
        return Err("policy should take the document's daily interval".to_string());
    }
    let now = std::time::Instant::now();
    if !policy.is_due(None, now) {
        return Err("first refresh should always be due".to_string());
    }
    if policy.is_due(Some(now), now) {
        return Err("refresh due immediately after a pass".to_string());
    }
    Ok(())
}
