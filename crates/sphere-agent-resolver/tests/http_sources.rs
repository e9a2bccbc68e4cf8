//! HTTP source tests for sphere-agent-resolver.
// crates/sphere-agent-resolver/tests/http_sources.rs
// =============================================================================
// Module: HTTP Source Tests
// Description: Network endpoint probe and refresh fetch against a live server.
// Purpose: Ensure HTTP status mapping and the authenticated refresh fetch.
// =============================================================================

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use sphere_agent_resolver::CandidateDisposition;
use sphere_agent_resolver::ConfigSourceCandidate;
use sphere_agent_resolver::EnrollmentLifecycle;
use sphere_agent_resolver::FixedProbe;
use sphere_agent_resolver::HttpConfigFetcher;
use sphere_agent_resolver::HttpProbe;
use sphere_agent_resolver::RefreshOutcome;
use sphere_agent_resolver::SourceKind;
use sphere_agent_resolver::resolve;
use sphere_agent_resolver::run_refresh;
use sphere_config_core::SessionToken;
use tiny_http::Response;
use tiny_http::Server;

type TestResult = Result<(), String>;

/// What the test server observed for one request.
struct RequestRecord {
    /// Request path as received.
    path: String,
    /// Authorization header value, when present.
    authorization: Option<String>,
}

fn valid_document_json(location: &str) -> String {
    format!(
        r#"{{
            "schema_version": 1,
            "environment": "production",
            "server_url": "https://control.sphere.example",
            "ws_path": "/ws/android",
            "enrollment_api_key": "sphr_enroll_abc123",
            "device_id": null,
            "workstation_id": "ws-PC-FARM-01",
            "instance_index": 42,
            "location": "{location}",
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

/// Starts a server answering every request with one fixed response, recording
/// what it saw. The serving thread exits after an idle timeout.
fn spawn_fixed_server(
    status: u16,
    body: String,
) -> Result<(String, mpsc::Receiver<RequestRecord>), String> {
    let server = Server::http("127.0.0.1:0").map_err(|err| err.to_string())?;
    let addr = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| "server bound to a non-ip address".to_string())?;
    let base = format!("http://{addr}");
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        while let Ok(Some(request)) = server.recv_timeout(Duration::from_secs(5)) {
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.as_str().to_string());
            let record = RequestRecord {
                path: request.url().to_string(),
                authorization,
            };
            if sender.send(record).is_err() {
                break;
            }
            let response = Response::from_string(body.clone()).with_status_code(status);
            if request.respond(response).is_err() {
                break;
            }
        }
    });
    Ok((base, receiver))
}

#[test]
fn network_endpoint_candidate_selected_when_served() -> TestResult {
    let (base, requests) = spawn_fixed_server(200, valid_document_json("fra-dc-2"))?;
    let probe = HttpProbe::new(&format!("{base}/provision/sphere-agent-config.json"))
        .map_err(|err| err.to_string())?;
    let candidates = vec![
        ConfigSourceCandidate::new(SourceKind::InternalStorage, FixedProbe::absent()),
        ConfigSourceCandidate::new(SourceKind::NetworkEndpoint, probe),
    ];
    let resolution = resolve(&candidates).map_err(|err| err.to_string())?;
    if resolution.provenance != SourceKind::NetworkEndpoint {
        return Err("served endpoint should win after local misses".to_string());
    }
    if resolution.document.location != "fra-dc-2" {
        return Err("document did not come from the endpoint".to_string());
    }
    let record = requests.recv_timeout(Duration::from_secs(5)).map_err(|err| err.to_string())?;
    if record.path != "/provision/sphere-agent-config.json" {
        return Err(format!("unexpected request path: {}", record.path));
    }
    Ok(())
}

#[test]
fn endpoint_server_error_recorded_as_read_failure() -> TestResult {
    let (base, _requests) = spawn_fixed_server(500, "backend unavailable".to_string())?;
    let probe = HttpProbe::new(&format!("{base}/provision/sphere-agent-config.json"))
        .map_err(|err| err.to_string())?;
    let candidates = vec![
        ConfigSourceCandidate::new(SourceKind::NetworkEndpoint, probe),
        ConfigSourceCandidate::new(
            SourceKind::BuiltinDefaults,
            FixedProbe::present(valid_document_json("builtin")),
        ),
    ];
    let resolution = resolve(&candidates).map_err(|err| err.to_string())?;
    if resolution.provenance != SourceKind::BuiltinDefaults {
        return Err("chain should fall through on a server error".to_string());
    }
    match &resolution.audit[0].disposition {
        CandidateDisposition::ReadFailed {
            reason,
        } => {
            if !reason.contains("500") {
                return Err(format!("unexpected read failure reason: {reason}"));
            }
        }
        _ => return Err("expected read-failed disposition".to_string()),
    }
    Ok(())
}

#[test]
fn slow_endpoint_times_out_and_chain_falls_through() -> TestResult {
    let server = Server::http("127.0.0.1:0").map_err(|err| err.to_string())?;
    let addr = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| "server bound to a non-ip address".to_string())?;
    let body = valid_document_json("fra-dc-2");
    thread::spawn(move || {
        // Hold the accepted request past the probe timeout before answering.
        if let Ok(Some(request)) = server.recv_timeout(Duration::from_secs(10)) {
            thread::sleep(Duration::from_secs(3));
            let _ = request.respond(Response::from_string(body));
        }
    });

    let probe = HttpProbe::with_timeout(
        &format!("http://{addr}/provision/sphere-agent-config.json"),
        Duration::from_secs(1),
    )
    .map_err(|err| err.to_string())?;
    let candidates = vec![
        ConfigSourceCandidate::new(SourceKind::NetworkEndpoint, probe),
        ConfigSourceCandidate::new(
            SourceKind::BuiltinDefaults,
            FixedProbe::present(valid_document_json("builtin")),
        ),
    ];
    let resolution = resolve(&candidates).map_err(|err| err.to_string())?;
    if resolution.provenance != SourceKind::BuiltinDefaults {
        return Err("chain should fall through past a timed-out endpoint".to_string());
    }
    match &resolution.audit[0].disposition {
        CandidateDisposition::ReadFailed {
            reason,
        } => {
            if !reason.contains("timed out") {
                return Err(format!("unexpected read failure reason: {reason}"));
            }
        }
        _ => return Err("expected read-failed disposition for the timeout".to_string()),
    }
    Ok(())
}

#[test]
fn endpoint_not_found_recorded_as_missing() -> TestResult {
    let (base, _requests) = spawn_fixed_server(404, "no config for this device".to_string())?;
    let probe = HttpProbe::new(&format!("{base}/provision/sphere-agent-config.json"))
        .map_err(|err| err.to_string())?;
    let candidates = vec![
        ConfigSourceCandidate::new(SourceKind::NetworkEndpoint, probe),
        ConfigSourceCandidate::new(
            SourceKind::BuiltinDefaults,
            FixedProbe::present(valid_document_json("builtin")),
        ),
    ];
    let resolution = resolve(&candidates).map_err(|err| err.to_string())?;
    if resolution.audit[0].disposition != CandidateDisposition::Missing {
        return Err("404 should read as an absent source".to_string());
    }
    if resolution.provenance != SourceKind::BuiltinDefaults {
        return Err("chain should fall through on 404".to_string());
    }
    Ok(())
}

#[test]
fn refresh_fetch_authenticates_and_supersedes() -> TestResult {
    let (base, requests) = spawn_fixed_server(200, valid_document_json("spb-office-3"))?;

    let lifecycle = EnrollmentLifecycle::new();
    let candidates = vec![ConfigSourceCandidate::new(
        SourceKind::InternalStorage,
        FixedProbe::present(valid_document_json("msk-office-1")),
    )];
    let resolution = resolve(&candidates).map_err(|err| err.to_string())?;
    lifecycle.begin_enrollment(resolution).map_err(|err| err.to_string())?;
    lifecycle
        .complete_enrollment(SessionToken::new("jwt-token"))
        .map_err(|err| err.to_string())?;

    let fetcher = HttpConfigFetcher::new(&base).map_err(|err| err.to_string())?;
    let outcome = run_refresh(&lifecycle, &fetcher).map_err(|err| err.to_string())?;
    if outcome != RefreshOutcome::Updated {
        return Err("served change should supersede the active document".to_string());
    }
    let active = lifecycle
        .active_document()
        .map_err(|err| err.to_string())?
        .ok_or_else(|| "active document vanished".to_string())?;
    if active.location != "spb-office-3" {
        return Err("active document not replaced by the served one".to_string());
    }

    let record = requests.recv_timeout(Duration::from_secs(5)).map_err(|err| err.to_string())?;
    if record.path != "/api/v1/config/agent" {
        return Err(format!("unexpected refresh path: {}", record.path));
    }
    if record.authorization.as_deref() != Some("Bearer jwt-token") {
        return Err("refresh request missing bearer authorization".to_string());
    }
    Ok(())
}
