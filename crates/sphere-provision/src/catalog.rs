// crates/sphere-provision/src/catalog.rs
// ============================================================================
// Module: Sphere Environment Catalog
// Description: Immutable environment-name to base-settings mapping.
// Purpose: Load and sanity-check environment definitions, all-or-nothing.
// Dependencies: sphere-config-core, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! The catalog maps environment names to base settings (server URL,
//! enrollment key, transport policy). Loading rejects the whole catalog on
//! any malformed entry so a broken environment can never silently fall back
//! to defaults. After load the catalog is read-only and safe for concurrent
//! generation requests; [`CatalogHandle`] adds atomic-swap reload on top.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use sphere_config_core::ENROLLMENT_KEY_PREFIX;
use sphere_config_core::EnvironmentName;
use sphere_config_core::FeatureFlags;
use sphere_config_core::document::DEFAULT_POLL_INTERVAL_SECONDS;
use sphere_config_core::document::DEFAULT_WS_PATH;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size for a single environment definition file.
pub const MAX_DEFINITION_BYTES: u64 = 64 * 1024;

/// Returns the default WebSocket path for deserialization.
fn default_ws_path() -> String {
    DEFAULT_WS_PATH.to_string()
}

/// Returns the default poll interval for deserialization.
const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

// ============================================================================
// SECTION: Environment Definition
// ============================================================================

/// Base settings for one deployment environment.
///
/// # Invariants
/// - Exactly one definition exists per environment name.
/// - Immutable after catalog load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDefinition {
    /// Environment name this definition belongs to.
    pub environment: EnvironmentName,
    /// Control-plane endpoint URL (HTTPS unless development).
    pub server_url: String,
    /// Enrollment key issued for this environment (`sphr_enroll_*`).
    pub enrollment_api_key: String,
    /// WebSocket path for the agent control channel.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    /// Backend config poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub config_poll_interval_seconds: u64,
    /// Default feature toggles for devices in this environment.
    #[serde(default)]
    pub features: FeatureFlags,
    /// Default location label when the device identity supplies none.
    #[serde(default)]
    pub location: Option<String>,
}

// ============================================================================
// SECTION: Catalog Errors
// ============================================================================

/// Errors produced while loading or reloading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Definition file could not be read.
    #[error("catalog io failure for {path}: {reason}")]
    Io {
        /// Offending file path.
        path: String,
        /// Underlying failure description.
        reason: String,
    },
    /// Definition file exceeded the size limit.
    #[error("catalog file {path} exceeds size limit of {limit} bytes")]
    FileTooLarge {
        /// Offending file path.
        path: String,
        /// Size limit in bytes.
        limit: u64,
    },
    /// Definition file was not well-formed JSON.
    #[error("catalog parse failure for {path}: {reason}")]
    Parse {
        /// Offending file path.
        path: String,
        /// Parser failure description.
        reason: String,
    },
    /// An entry failed catalog-level sanity checks; the whole catalog is
    /// rejected.
    #[error("malformed catalog entry {environment}: {reason}")]
    Malformed {
        /// Environment name of the offending entry.
        environment: String,
        /// Sanity-check failure description.
        reason: String,
    },
    /// Catalog directory contained no definitions.
    #[error("catalog contains no environment definitions")]
    Empty,
    /// Catalog handle lock was poisoned.
    #[error("catalog handle lock poisoned")]
    Poisoned,
}

// ============================================================================
// SECTION: Environment Catalog
// ============================================================================

/// Immutable mapping from environment name to definition.
///
/// # Invariants
/// - Every entry has passed catalog-level sanity checks.
/// - Read-only after construction; safe for concurrent readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentCatalog {
    /// Definitions keyed by environment name.
    entries: BTreeMap<String, EnvironmentDefinition>,
}

impl EnvironmentCatalog {
    /// Builds a catalog from in-memory definitions, all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when any entry fails sanity checks, a name
    /// is duplicated, or the list is empty.
    pub fn from_entries(
        definitions: impl IntoIterator<Item = EnvironmentDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut entries = BTreeMap::new();
        for definition in definitions {
            check_entry(&definition)?;
            let name = definition.environment.as_str().to_string();
            if entries.insert(name.clone(), definition).is_some() {
                return Err(CatalogError::Malformed {
                    environment: name,
                    reason: "duplicate environment name".to_string(),
                });
            }
        }
        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self {
            entries,
        })
    }

    /// Loads every `<name>.json` definition from a catalog directory.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] on I/O or parse failures, oversized files,
    /// entries whose `environment` field disagrees with the file name, or
    /// any sanity-check failure. One bad file rejects the whole catalog.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        let listing = std::fs::read_dir(dir).map_err(|err| CatalogError::Io {
            path: dir.display().to_string(),
            reason: err.to_string(),
        })?;
        let mut definitions = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|err| CatalogError::Io {
                path: dir.display().to_string(),
                reason: err.to_string(),
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let definition = load_definition(&path)?;
            let stem = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or_default();
            if definition.environment.as_str() != stem {
                return Err(CatalogError::Malformed {
                    environment: definition.environment.as_str().to_string(),
                    reason: format!("environment field disagrees with file name {stem}.json"),
                });
            }
            definitions.push(definition);
        }
        Self::from_entries(definitions)
    }

    /// Returns the definition for an environment name.
    #[must_use]
    pub fn get(&self, name: &EnvironmentName) -> Option<&EnvironmentDefinition> {
        self.entries.get(name.as_str())
    }

    /// Returns all environment names in the catalog, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of environments in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the catalog holds no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads and parses one definition file with size and format guards.
fn load_definition(path: &Path) -> Result<EnvironmentDefinition, CatalogError> {
    let metadata = std::fs::metadata(path).map_err(|err| CatalogError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    if metadata.len() > MAX_DEFINITION_BYTES {
        return Err(CatalogError::FileTooLarge {
            path: path.display().to_string(),
            limit: MAX_DEFINITION_BYTES,
        });
    }
    let bytes = std::fs::read(path).map_err(|err| CatalogError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| CatalogError::Parse {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Runs catalog-level sanity checks for one definition.
fn check_entry(definition: &EnvironmentDefinition) -> Result<(), CatalogError> {
    let environment = definition.environment.as_str().to_string();
    let fail = |reason: String| CatalogError::Malformed {
        environment: environment.clone(),
        reason,
    };
    if environment.is_empty() {
        return Err(fail("environment name is empty".to_string()));
    }
    if definition.server_url.is_empty() {
        return Err(fail("server_url is missing".to_string()));
    }
    let url = Url::parse(&definition.server_url)
        .map_err(|err| fail(format!("server_url is not a valid uri: {err}")))?;
    match url.scheme() {
        "https" => {}
        "http" if definition.environment.allows_insecure_http() => {}
        scheme => {
            return Err(fail(format!("server_url scheme {scheme} is not permitted")));
        }
    }
    if definition.enrollment_api_key.is_empty() {
        return Err(fail("enrollment_api_key is missing".to_string()));
    }
    if !definition.enrollment_api_key.starts_with(ENROLLMENT_KEY_PREFIX) {
        return Err(fail(format!("enrollment_api_key must start with {ENROLLMENT_KEY_PREFIX}")));
    }
    if definition.config_poll_interval_seconds == 0 {
        return Err(fail("config_poll_interval_seconds must be >= 1".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Catalog Handle
// ============================================================================

/// Shared catalog handle with atomic snapshot swap.
///
/// # Invariants
/// - Readers observe either the previous snapshot in full or the new one in
///   full, never a partially updated mapping.
pub struct CatalogHandle {
    /// Current catalog snapshot.
    current: RwLock<Arc<EnvironmentCatalog>>,
}

impl CatalogHandle {
    /// Creates a handle over an initial catalog snapshot.
    #[must_use]
    pub fn new(catalog: EnvironmentCatalog) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Returns the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Poisoned`] when the lock is poisoned.
    pub fn snapshot(&self) -> Result<Arc<EnvironmentCatalog>, CatalogError> {
        let guard = self.current.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Swaps in a new catalog snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Poisoned`] when the lock is poisoned.
    pub fn swap(&self, catalog: EnvironmentCatalog) -> Result<(), CatalogError> {
        let mut guard = self.current.write().map_err(|_| CatalogError::Poisoned)?;
        *guard = Arc::new(catalog);
        Ok(())
    }
}
