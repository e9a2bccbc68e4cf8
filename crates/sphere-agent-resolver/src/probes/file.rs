// crates/sphere-agent-resolver/src/probes/file.rs
// ============================================================================
// Module: Sphere File Probe
// Description: File-backed candidate probe for filesystem discovery sources.
// Purpose: Read candidate bytes from a well-known path with a size cap.
// Dependencies: std
// ============================================================================

//! ## Overview
//! `FileProbe` reads the artifact from one well-known filesystem path. It
//! serves the provisioning-file, external-storage, and internal-storage
//! sources; a missing file maps to [`ProbeError::NotFound`] so the resolver
//! moves on without logging an I/O failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::io::Read;
use std::path::PathBuf;

use crate::candidate::CandidateProbe;
use crate::candidate::MAX_CANDIDATE_BYTES;
use crate::candidate::ProbeError;
use crate::candidate::enforce_max_bytes;

// ============================================================================
// SECTION: File Probe
// ============================================================================

/// File-backed candidate probe.
#[derive(Debug, Clone)]
pub struct FileProbe {
    /// Well-known artifact path for this source.
    path: PathBuf,
}

impl FileProbe {
    /// Creates a probe for the given artifact path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }
}

impl CandidateProbe for FileProbe {
    fn read(&self) -> Result<Vec<u8>, ProbeError> {
        let file = std::fs::File::open(&self.path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ProbeError::NotFound
            } else {
                ProbeError::Io(err.to_string())
            }
        })?;
        let mut limited = file.take((MAX_CANDIDATE_BYTES + 1) as u64);
        let mut bytes = Vec::new();
        limited.read_to_end(&mut bytes).map_err(|err| ProbeError::Io(err.to_string()))?;
        enforce_max_bytes(bytes.len())?;
        Ok(bytes)
    }
}
