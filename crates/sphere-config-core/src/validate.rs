// crates/sphere-config-core/src/validate.rs
// ============================================================================
// Module: Sphere Config Validator
// Description: Violation-accumulating validation for agent-config documents.
// Purpose: Gate every emitted or resolved document behind one fail-closed check.
// Dependencies: thiserror, time, url
// ============================================================================

//! ## Overview
//! The validator is a pure function over a candidate document. It collects
//! every violation rather than stopping at the first, so provisioning
//! operators and device logs can report all problems at once. Both the
//! generator (before emitting) and the device resolver (per candidate) run
//! documents through [`validate_document`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::document::AgentConfigDocument;
use crate::document::SCHEMA_VERSION;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Required prefix for enrollment keys (capability scope `device:register`).
pub const ENROLLMENT_KEY_PREFIX: &str = "sphr_enroll_";

// ============================================================================
// SECTION: Violations
// ============================================================================

/// A single schema violation found in a candidate document.
///
/// # Invariants
/// - Messages never echo credential material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// A required field is missing or empty.
    #[error("required field is missing or empty: {field}")]
    MissingField {
        /// Document field name.
        field: &'static str,
    },
    /// `server_url` failed to parse as a URI.
    #[error("server_url is not a valid uri: {reason}")]
    InvalidServerUrl {
        /// Parser failure description.
        reason: String,
    },
    /// `server_url` uses a scheme other than http/https.
    #[error("server_url has unsupported scheme: {scheme}")]
    UnsupportedScheme {
        /// Offending URL scheme.
        scheme: String,
    },
    /// Non-TLS `server_url` outside the development environment.
    #[error("server_url must use https in environment {environment}")]
    InsecureServerUrl {
        /// Environment that requires HTTPS.
        environment: String,
    },
    /// Enrollment key does not carry the `sphr_enroll_` prefix.
    #[error("enrollment_api_key must start with {ENROLLMENT_KEY_PREFIX}")]
    BadEnrollmentKeyPrefix,
    /// Document schema version is not supported by this build.
    #[error("unsupported schema_version {found} (expected {SCHEMA_VERSION})")]
    UnsupportedSchemaVersion {
        /// Version found in the document.
        found: u32,
    },
    /// Poll interval is outside the accepted range.
    #[error("config_poll_interval_seconds must be >= 1 (got {seconds})")]
    PollIntervalOutOfRange {
        /// Offending interval value.
        seconds: u64,
    },
    /// `ws_path` does not start with a slash.
    #[error("ws_path must be an absolute path: {path}")]
    InvalidWsPath {
        /// Offending path value.
        path: String,
    },
    /// `generated_at` is not an RFC 3339 timestamp.
    #[error("generated_at is not a valid rfc3339 timestamp")]
    InvalidGeneratedAt,
    /// An override targeted a field that overrides may not touch.
    #[error("override may not change field: {field}")]
    ForbiddenOverride {
        /// Field the override attempted to replace.
        field: String,
    },
    /// An override named a field that does not exist in the document.
    #[error("override names unknown field: {field}")]
    UnknownOverrideField {
        /// Unrecognized field name.
        field: String,
    },
    /// An override value had the wrong JSON type for its field.
    #[error("override for field {field} has invalid type or value")]
    InvalidOverrideValue {
        /// Field the override attempted to replace.
        field: String,
    },
}

// ============================================================================
// SECTION: Validation Report
// ============================================================================

/// Aggregated validation outcome listing every violation found.
///
/// # Invariants
/// - An empty violation list means the document is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Violations in document field order.
    violations: Vec<Violation>,
}

impl ValidationReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    /// Records a violation.
    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Returns true when no violations were recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the recorded violations.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes the report, returning its violations.
    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return f.write_str("valid");
        }
        let mut first = true;
        for violation in &self.violations {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
            first = false;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Document Validation
// ============================================================================

/// Validates a candidate document, collecting every violation found.
///
/// Pure over its input; no I/O and no side effects.
#[must_use]
pub fn validate_document(document: &AgentConfigDocument) -> ValidationReport {
    let mut report = ValidationReport::new();

    if document.schema_version != SCHEMA_VERSION {
        report.push(Violation::UnsupportedSchemaVersion {
            found: document.schema_version,
        });
    }
    if document.environment.as_str().is_empty() {
        report.push(Violation::MissingField {
            field: "environment",
        });
    }
    check_server_url(document, &mut report);
    check_enrollment_key(&document.enrollment_api_key, &mut report);
    if document.workstation_id.is_empty() {
        report.push(Violation::MissingField {
            field: "workstation_id",
        });
    }
    if document.location.is_empty() {
        report.push(Violation::MissingField {
            field: "location",
        });
    }
    if document.ws_path.is_empty() {
        report.push(Violation::MissingField {
            field: "ws_path",
        });
    } else if !document.ws_path.starts_with('/') {
        report.push(Violation::InvalidWsPath {
            path: document.ws_path.clone(),
        });
    }
    if document.config_poll_interval_seconds == 0 {
        report.push(Violation::PollIntervalOutOfRange {
            seconds: document.config_poll_interval_seconds,
        });
    }
    check_generated_at(&document.generated_at, &mut report);

    report
}

/// Validates the server URL syntax and scheme policy.
fn check_server_url(document: &AgentConfigDocument, report: &mut ValidationReport) {
    if document.server_url.is_empty() {
        report.push(Violation::MissingField {
            field: "server_url",
        });
        return;
    }
    let url = match Url::parse(&document.server_url) {
        Ok(url) => url,
        Err(err) => {
            report.push(Violation::InvalidServerUrl {
                reason: err.to_string(),
            });
            return;
        }
    };
    match url.scheme() {
        "https" => {}
        "http" => {
            if !document.environment.allows_insecure_http() {
                report.push(Violation::InsecureServerUrl {
                    environment: document.environment.as_str().to_string(),
                });
            }
        }
        scheme => {
            report.push(Violation::UnsupportedScheme {
                scheme: scheme.to_string(),
            });
        }
    }
}

/// Validates enrollment key presence and prefix.
fn check_enrollment_key(key: &str, report: &mut ValidationReport) {
    if key.is_empty() {
        report.push(Violation::MissingField {
            field: "enrollment_api_key",
        });
        return;
    }
    if !key.starts_with(ENROLLMENT_KEY_PREFIX) || key.len() == ENROLLMENT_KEY_PREFIX.len() {
        report.push(Violation::BadEnrollmentKeyPrefix);
    }
}

/// Validates the generation timestamp format.
fn check_generated_at(generated_at: &str, report: &mut ValidationReport) {
    if generated_at.is_empty() {
        report.push(Violation::MissingField {
            field: "generated_at",
        });
        return;
    }
    if OffsetDateTime::parse(generated_at, &Rfc3339).is_err() {
        report.push(Violation::InvalidGeneratedAt);
    }
}
