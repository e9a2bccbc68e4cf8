// crates/sphere-agent-resolver/src/refresh.rs
// ============================================================================
// Module: Sphere Config Refresh
// Description: Daily re-check of the served config against the backend.
// Purpose: Supersede the active document on change, never on failure.
// Dependencies: sphere-config-core, reqwest, url, thiserror
// ============================================================================

//! ## Overview
//! Once enrolled, the agent polls `GET /api/v1/config/agent` on the interval
//! carried in its own document (daily by default). The cycle is decoupled
//! from enrollment-time resolution: a refresh requested while an enrollment
//! is still in progress is deferred, and any non-success fetch, decode, or
//! validation failure leaves the in-memory configuration unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use sphere_config_core::AgentConfigDocument;
use sphere_config_core::SessionToken;
use sphere_config_core::validate_document;
use thiserror::Error;
use url::Url;

use crate::lifecycle::EnrollmentLifecycle;
use crate::lifecycle::LifecycleError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Backend path serving the authoritative agent config.
pub const CONFIG_ENDPOINT_PATH: &str = "/api/v1/config/agent";

/// Request timeout for refresh fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SECTION: Fetch Errors
// ============================================================================

/// Errors produced while fetching the served config.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Endpoint URL failed to parse.
    #[error("invalid config endpoint: {0}")]
    InvalidEndpoint(String),
    /// Request failed at the transport level.
    #[error("fetch failure: {0}")]
    Transport(String),
    /// Backend returned a non-success status.
    #[error("config endpoint returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// Response body was not a well-formed document.
    #[error("config response decode failure: {0}")]
    Decode(String),
}

// ============================================================================
// SECTION: Fetcher Trait
// ============================================================================

/// Fetches the currently served config for an enrolled device.
pub trait ConfigFetcher {
    /// Fetches the served document, authorized by the session token.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport, status, or decode failures.
    fn fetch_current(&self, token: &SessionToken) -> Result<AgentConfigDocument, FetchError>;
}

/// HTTP implementation of [`ConfigFetcher`] against the control plane.
#[derive(Debug, Clone)]
pub struct HttpConfigFetcher {
    /// HTTP client with redirects disabled.
    client: Client,
    /// Fully resolved config endpoint URL.
    endpoint: Url,
}

impl HttpConfigFetcher {
    /// Builds a fetcher for the given control-plane base URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] on a bad URL or client
    /// construction failure.
    pub fn new(server_url: &str) -> Result<Self, FetchError> {
        let base =
            Url::parse(server_url).map_err(|err| FetchError::InvalidEndpoint(err.to_string()))?;
        let endpoint = base
            .join(CONFIG_ENDPOINT_PATH)
            .map_err(|err| FetchError::InvalidEndpoint(err.to_string()))?;
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|err| FetchError::InvalidEndpoint(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
        })
    }
}

impl ConfigFetcher for HttpConfigFetcher {
    fn fetch_current(&self, token: &SessionToken) -> Result<AgentConfigDocument, FetchError> {
        let response = self
            .client
            .get(self.endpoint.as_str())
            .bearer_auth(token.as_str())
            .send()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().map_err(|err| FetchError::Transport(err.to_string()))?;
        AgentConfigDocument::from_json_bytes(&bytes)
            .map_err(|err| FetchError::Decode(err.to_string()))
    }
}

// ============================================================================
// SECTION: Refresh Policy
// ============================================================================

/// Schedule for the periodic refresh cycle.
///
/// # Invariants
/// - The interval comes from the active document's
///   `config_poll_interval_seconds` (daily by default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Interval between refresh passes.
    interval: Duration,
}

impl RefreshPolicy {
    /// Derives the policy from the active document.
    #[must_use]
    pub const fn from_document(document: &AgentConfigDocument) -> Self {
        Self {
            interval: Duration::from_secs(document.config_poll_interval_seconds),
        }
    }

    /// Returns the refresh interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true when a refresh is due.
    #[must_use]
    pub fn is_due(&self, last_refresh: Option<Instant>, now: Instant) -> bool {
        last_refresh.is_none_or(|last| now.duration_since(last) >= self.interval)
    }
}

// ============================================================================
// SECTION: Refresh Cycle
// ============================================================================

/// Outcome of one refresh pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Served config matches the active document; nothing changed.
    Unchanged,
    /// Served config differed; the active document was superseded.
    Updated,
    /// Enrollment was in progress; refresh was deferred.
    Deferred,
    /// Fetch or validation failed; active document left untouched.
    Failed {
        /// Failure description for the caller's log.
        reason: String,
    },
}

/// Runs one refresh pass against the backend.
///
/// # Errors
///
/// Returns [`LifecycleError`] when the lifecycle is not in a refreshable
/// phase (other than the deferred case, which maps to
/// [`RefreshOutcome::Deferred`]).
pub fn run_refresh(
    lifecycle: &EnrollmentLifecycle,
    fetcher: &dyn ConfigFetcher,
) -> Result<RefreshOutcome, LifecycleError> {
    let Some(token) = lifecycle.credentials()?.session_token()? else {
        return Ok(RefreshOutcome::Failed {
            reason: "no session token held".to_string(),
        });
    };
    match lifecycle.begin_refresh() {
        Ok(()) => {}
        Err(LifecycleError::RefreshDeferred) => return Ok(RefreshOutcome::Deferred),
        Err(err) => return Err(err),
    }

    let outcome = match fetcher.fetch_current(&token) {
        Ok(served) => {
            let report = validate_document(&served);
            if report.is_valid() {
                let unchanged = lifecycle
                    .active_document()?
                    .is_some_and(|active| active.same_parameters(&served));
                if unchanged {
                    (None, RefreshOutcome::Unchanged)
                } else {
                    (Some(served), RefreshOutcome::Updated)
                }
            } else {
                (
                    None,
                    RefreshOutcome::Failed {
                        reason: format!("served config failed validation: {report}"),
                    },
                )
            }
        }
        Err(err) => (
            None,
            RefreshOutcome::Failed {
                reason: err.to_string(),
            },
        ),
    };
    let (updated, result) = outcome;
    lifecycle.finish_refresh(updated)?;
    Ok(result)
}
