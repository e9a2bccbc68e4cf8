// crates/sphere-agent-resolver/src/candidate.rs
// ============================================================================
// Module: Sphere Config Source Candidates
// Description: The seven discovery sources and the probe trait they share.
// Purpose: Model the fixed-precedence discovery chain as a strategy table.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Each candidate pairs a [`SourceKind`] (which fixes its rank, trust level,
//! and network requirement) with a read operation behind [`CandidateProbe`].
//! The chain is a tagged-variant list processed by one ordered scan, not a
//! per-source type hierarchy. Candidates are constructed fresh for each
//! resolution pass and never persisted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size for a candidate config payload.
pub const MAX_CANDIDATE_BYTES: usize = 256 * 1024;

/// Returns an error when a candidate payload exceeds the size cap.
pub(crate) fn enforce_max_bytes(actual_bytes: usize) -> Result<(), ProbeError> {
    if actual_bytes > MAX_CANDIDATE_BYTES {
        return Err(ProbeError::TooLarge {
            max_bytes: MAX_CANDIDATE_BYTES,
            actual_bytes,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Source Kinds
// ============================================================================

/// The seven discovery sources, in fixed precedence order.
///
/// # Invariants
/// - `rank` is a strict total order; no two kinds share a rank.
/// - Wire names are stable for provenance reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    /// Previously-enrolled encrypted local store.
    EncryptedStore,
    /// Enterprise-managed configuration pushed by a device-management layer.
    ManagedConfig,
    /// Filesystem path writable by an external provisioning tool.
    ProvisioningFile,
    /// App-external-storage path.
    ExternalStorage,
    /// App-internal-storage path.
    InternalStorage,
    /// Network-fetched configuration endpoint.
    NetworkEndpoint,
    /// Compiled-in defaults.
    BuiltinDefaults,
}

impl SourceKind {
    /// Returns the fixed priority rank (1 = highest priority).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::EncryptedStore => 1,
            Self::ManagedConfig => 2,
            Self::ProvisioningFile => 3,
            Self::ExternalStorage => 4,
            Self::InternalStorage => 5,
            Self::NetworkEndpoint => 6,
            Self::BuiltinDefaults => 7,
        }
    }

    /// Returns the trust level assigned to this source kind.
    #[must_use]
    pub const fn trust(self) -> TrustLevel {
        match self {
            Self::EncryptedStore => TrustLevel::Enrolled,
            Self::ManagedConfig => TrustLevel::Managed,
            Self::ProvisioningFile | Self::ExternalStorage | Self::InternalStorage => {
                TrustLevel::Provisioned
            }
            Self::NetworkEndpoint => TrustLevel::Network,
            Self::BuiltinDefaults => TrustLevel::Builtin,
        }
    }

    /// Returns true when probing this source requires network access.
    #[must_use]
    pub const fn requires_network(self) -> bool {
        matches!(self, Self::NetworkEndpoint)
    }

    /// Returns the stable provenance tag for this source kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EncryptedStore => "encrypted_store",
            Self::ManagedConfig => "managed_config",
            Self::ProvisioningFile => "provisioning_file",
            Self::ExternalStorage => "external_storage",
            Self::InternalStorage => "internal_storage",
            Self::NetworkEndpoint => "network_endpoint",
            Self::BuiltinDefaults => "builtin_defaults",
        }
    }
}

// ============================================================================
// SECTION: Trust Levels
// ============================================================================

/// Authority level of a discovery source.
///
/// # Invariants
/// - Informational for auditing; precedence is fixed by rank, not trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    /// Device already enrolled; credentials previously exchanged.
    Enrolled,
    /// Pushed by an enterprise device-management layer.
    Managed,
    /// Written by a provisioning tool or operator.
    Provisioned,
    /// Fetched over the network at boot.
    Network,
    /// Compiled into the agent binary.
    Builtin,
}

// ============================================================================
// SECTION: Probe Errors
// ============================================================================

/// Errors produced while reading one candidate source.
///
/// Recovered locally by the resolver: a failing candidate is skipped, never
/// fatal on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Source is absent (file missing, endpoint not configured).
    #[error("source not present")]
    NotFound,
    /// Source reported an I/O failure.
    #[error("io failure: {0}")]
    Io(String),
    /// Network source failed.
    #[error("http failure: {0}")]
    Http(String),
    /// Network source exceeded its per-candidate timeout.
    #[error("probe timed out after {seconds}s")]
    Timeout {
        /// Configured timeout in seconds.
        seconds: u64,
    },
    /// Endpoint URL failed to parse or used an unsupported scheme.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Payload exceeded the configured byte limit.
    #[error("payload exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

// ============================================================================
// SECTION: Probe Trait
// ============================================================================

/// Reads raw candidate bytes from one discovery source.
pub trait CandidateProbe: Send + Sync {
    /// Reads the candidate payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::NotFound`] when the source is absent and other
    /// [`ProbeError`] variants when it is present but unreadable.
    fn read(&self) -> Result<Vec<u8>, ProbeError>;
}

// ============================================================================
// SECTION: Candidates
// ============================================================================

/// One entry in the discovery chain: a source kind plus its read operation.
///
/// # Invariants
/// - Constructed fresh for each resolution pass.
pub struct ConfigSourceCandidate {
    /// Source kind fixing rank, trust, and network requirement.
    kind: SourceKind,
    /// Read operation for this source.
    probe: Box<dyn CandidateProbe>,
}

impl ConfigSourceCandidate {
    /// Pairs a source kind with its probe.
    #[must_use]
    pub fn new(kind: SourceKind, probe: impl CandidateProbe + 'static) -> Self {
        Self {
            kind,
            probe: Box::new(probe),
        }
    }

    /// Returns the source kind.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Reads the candidate payload.
    ///
    /// # Errors
    ///
    /// Propagates the probe's [`ProbeError`].
    pub fn read(&self) -> Result<Vec<u8>, ProbeError> {
        self.probe.read()
    }
}
