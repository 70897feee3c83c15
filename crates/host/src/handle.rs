use serde::{Deserialize, Serialize};

/// Opaque numeric identifier the host assigns to a function at registration.
///
/// Stable for the lifetime of a host session; NOT stable across sessions or
/// module reloads. The registration table only ever caches a copy — the host
/// owns the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionHandle(u64);

impl FunctionHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FunctionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
