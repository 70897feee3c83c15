//! Concurrent mapping from function names to host-assigned handles.
//!
//! Populated once per module load and consulted on every dispatch. Safe for
//! concurrent read and concurrent insert from host worker threads with no
//! caller-side locking. Invariant: once a name maps to a handle, the mapping
//! never changes value (write-once-per-key).

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use gridprobe_host::{FunctionHandle, HostCall, HostError};

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// The host has no registration for this name (module not loaded, or
    /// resolved too early in bootstrap).
    UnresolvedName(String),
    /// The host's resolve primitive faulted for some other reason.
    Host(HostError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedName(name) => write!(f, "unresolved name '{name}'"),
            Self::Host(e) => write!(f, "host resolve failed: {e}"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Name -> handle cache, shared across all concurrently executing calls.
#[derive(Default)]
pub struct RegistrationTable {
    entries: RwLock<FxHashMap<String, FunctionHandle>>,
}

impl RegistrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `name`, querying the host on first use.
    ///
    /// The read lock is released before the host round-trip and the write
    /// lock is only taken for the insert: holding a lock across a call back
    /// into the host risks deadlock if the host re-enters this module on
    /// another thread. If two threads race the round-trip, the first insert
    /// wins and both observe the same handle thereafter.
    pub fn resolve(
        &self,
        host: &dyn HostCall,
        name: &str,
    ) -> Result<FunctionHandle, RegistryError> {
        if let Some(handle) = self.try_get(name) {
            return Ok(handle);
        }

        let handle = host.resolve_name(name).map_err(|e| match e {
            HostError::UnknownName(n) => RegistryError::UnresolvedName(n),
            other => RegistryError::Host(other),
        })?;

        let mut entries = self.entries.write();
        Ok(*entries.entry(name.to_string()).or_insert(handle))
    }

    /// Non-populating lookup for the hot dispatch path.
    ///
    /// Never triggers a host round-trip: lazy resolution from inside a
    /// nested call can re-enter the host's registration machinery unsafely,
    /// so absence here must surface as a loud failure at the call site.
    pub fn try_get(&self, name: &str) -> Option<FunctionHandle> {
        self.entries.read().get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registered names, sorted (for reports).
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}
