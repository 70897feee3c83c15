//! The synchronous call interface into the host.
//!
//! `HostCall` is the seam between extension code and the host application.
//! Registered functions receive a `CallContext` whose `host` reference is the
//! explicit re-entrancy capability: a function already executing inside a
//! host-issued call may dispatch further calls through it. Implementations
//! must be reentrant-safe for well-formed calls, and callers must never hold
//! a lock across any of these methods.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::handle::FunctionHandle;
use crate::thread::ThreadSample;
use crate::value::Value;

/// Fault surfaced by the host's call machinery.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// No module has registered this name yet.
    UnknownName(String),
    /// Handle does not (or no longer does) refer to a registered function.
    UnknownHandle(FunctionHandle),
    /// Wrong number of arguments for the target function.
    ArgCount { expected: usize, got: usize },
    /// Argument at `index` had the wrong type.
    ArgType {
        index: usize,
        expected: &'static str,
        got: &'static str,
    },
    /// Module path is not known to the host.
    ModuleNotFound(PathBuf),
    /// Module was found but failed to load or unload.
    ModuleFailed { path: PathBuf, message: String },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownName(name) => write!(f, "unknown function name '{name}'"),
            Self::UnknownHandle(handle) => write!(f, "unknown function handle {handle}"),
            Self::ArgCount { expected, got } => {
                write!(f, "expected {expected} argument(s), got {got}")
            }
            Self::ArgType {
                index,
                expected,
                got,
            } => write!(f, "argument {index}: expected {expected}, got {got}"),
            Self::ModuleNotFound(path) => write!(f, "module not found: {}", path.display()),
            Self::ModuleFailed { path, message } => {
                write!(f, "module {} failed: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for HostError {}

/// Context handed to a registered function for the duration of one call.
///
/// `thread` is captured by the host shim at function entry. `host` lets the
/// function dispatch nested calls while its own frame is still active.
pub struct CallContext<'a> {
    pub thread: ThreadSample,
    pub host: &'a dyn HostCall,
}

impl<'a> CallContext<'a> {
    pub fn new(thread: ThreadSample, host: &'a dyn HostCall) -> Self {
        Self { thread, host }
    }
}

/// Synchronous host call primitives. All in-process, single host instance.
pub trait HostCall: Send + Sync {
    /// Registration query: name -> handle, or `UnknownName`.
    fn resolve_name(&self, name: &str) -> Result<FunctionHandle, HostError>;

    /// Generic invoke-by-handle. Runs the target synchronously on the calling
    /// thread and returns its result or a host-level fault.
    fn invoke(&self, handle: FunctionHandle, args: &[Value]) -> Result<Value, HostError>;

    /// Load/initialize the module at `path`. Idempotent per path per session.
    fn load_module(&self, path: &Path) -> Result<(), HostError>;

    /// Unload/finalize the module at `path`. Idempotent per path per session.
    fn unload_module(&self, path: &Path) -> Result<(), HostError>;
}
