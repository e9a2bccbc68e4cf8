// crates/sphere-agent-resolver/src/probes/http.rs
// ============================================================================
// Module: Sphere HTTP Probe
// Description: HTTP-backed candidate probe for the network endpoint source.
// Purpose: Fetch candidate bytes via HTTP GET under a per-candidate timeout.
// Dependencies: reqwest, url
// ============================================================================

//! ## Overview
//! `HttpProbe` fetches the candidate from a configuration endpoint. Redirects
//! are disabled and every request runs under a per-candidate timeout so one
//! unreachable endpoint cannot stall enrollment; a timed-out probe is treated
//! as failed and not retried within the same resolution pass. A 404 maps to
//! [`ProbeError::NotFound`] (endpoint serving nothing for this device).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use url::Url;

use crate::candidate::CandidateProbe;
use crate::candidate::MAX_CANDIDATE_BYTES;
use crate::candidate::ProbeError;
use crate::candidate::enforce_max_bytes;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default per-candidate timeout for network probes.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// SECTION: HTTP Probe
// ============================================================================

/// HTTP-backed candidate probe.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    /// HTTP client with redirects disabled and the timeout applied.
    client: Client,
    /// Endpoint URL served by the provisioning backend.
    url: Url,
    /// Per-candidate timeout, kept for error reporting.
    timeout: Duration,
}

impl HttpProbe {
    /// Builds a probe for the given endpoint with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidEndpoint`] on a bad URL or client
    /// construction failure.
    pub fn new(endpoint: &str) -> Result<Self, ProbeError> {
        Self::with_timeout(endpoint, DEFAULT_PROBE_TIMEOUT)
    }

    /// Builds a probe with an explicit per-candidate timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::InvalidEndpoint`] on a bad URL or client
    /// construction failure.
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, ProbeError> {
        let url = Url::parse(endpoint).map_err(|err| ProbeError::InvalidEndpoint(err.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ProbeError::InvalidEndpoint(format!("unsupported scheme {scheme}")));
            }
        }
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| ProbeError::InvalidEndpoint(err.to_string()))?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }
}

impl CandidateProbe for HttpProbe {
    fn read(&self) -> Result<Vec<u8>, ProbeError> {
        let response = self.client.get(self.url.as_str()).send().map_err(|err| {
            if err.is_timeout() {
                ProbeError::Timeout {
                    seconds: self.timeout.as_secs(),
                }
            } else {
                ProbeError::Http(err.to_string())
            }
        })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ProbeError::NotFound);
        }
        if !response.status().is_success() {
            return Err(ProbeError::Http(format!("http status {}", response.status())));
        }
        if let Some(length) = response.content_length() {
            if length > MAX_CANDIDATE_BYTES as u64 {
                return Err(ProbeError::TooLarge {
                    max_bytes: MAX_CANDIDATE_BYTES,
                    actual_bytes: usize::try_from(length).unwrap_or(usize::MAX),
                });
            }
        }
        let mut limited = response.take((MAX_CANDIDATE_BYTES + 1) as u64);
        let mut bytes = Vec::new();
        limited.read_to_end(&mut bytes).map_err(|err| ProbeError::Http(err.to_string()))?;
        enforce_max_bytes(bytes.len())?;
        Ok(bytes)
    }
}
