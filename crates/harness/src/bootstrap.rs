//! Module bootstrap.
//!
//! On load: discover sibling extension modules next to our own install path,
//! ask the host to load each one that it knows, then eagerly resolve every
//! function name the orchestrator depends on — so that steady-state dispatch
//! can stay on the non-populating `try_get` path. A missing sibling is a
//! warning, never a bootstrap failure: the remaining modules still load and
//! their probes still resolve.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gridprobe_host::HostCall;
use gridprobe_registry::RegistrationTable;

/// Sibling module files expected next to this module's install path.
pub const SIBLING_MODULES: &[&str] = &["probes_alpha.xmod", "probes_beta.xmod"];

/// Every name the orchestrator (and the nested caller probes) dispatches to.
/// Resolved eagerly at bootstrap; steady state uses `try_get` only.
pub const REQUIRED_FUNCTIONS: &[&str] = &[
    "alpha_add_inner",
    "alpha_doubled",
    "alpha_inner_thread_info",
    "alpha_thread_calc",
    "alpha_thread_report",
    "beta_add_inner",
    "beta_doubled",
    "beta_thread_calc",
    "beta_thread_report",
    "ts_inner_thread_info",
];

/// A sibling that failed to load or unload. Logged, not fatal.
#[derive(Debug, Clone)]
pub struct ModuleLoadWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for ModuleLoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// What bootstrap accomplished, for logging.
#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    /// Sibling modules successfully loaded.
    pub loaded: Vec<PathBuf>,
    /// Names resolved into the registration table.
    pub resolved: usize,
    /// Names that could not be resolved (their module did not load).
    pub unresolved: Vec<String>,
    pub warnings: Vec<ModuleLoadWarning>,
}

impl BootstrapReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.unresolved.is_empty()
    }

    /// One-line summary, e.g.
    /// `[bootstrap] 2 module(s) loaded  10 name(s) resolved  warnings=0`
    pub fn log_line(&self) -> String {
        format!(
            "[bootstrap] {} module(s) loaded  {} name(s) resolved  warnings={}",
            self.loaded.len(),
            self.resolved,
            self.warnings.len() + self.unresolved.len()
        )
    }
}

pub struct Bootstrap {
    install_path: PathBuf,
    table: Arc<RegistrationTable>,
    loaded: Vec<PathBuf>,
}

impl Bootstrap {
    /// `install_path` is this module's own file path; siblings are discovered
    /// in its parent directory.
    pub fn new(install_path: impl Into<PathBuf>, table: Arc<RegistrationTable>) -> Self {
        Self {
            install_path: install_path.into(),
            table,
            loaded: Vec::new(),
        }
    }

    pub fn table(&self) -> Arc<RegistrationTable> {
        Arc::clone(&self.table)
    }

    /// Load siblings and pre-resolve the required function list.
    pub fn run(&mut self, host: &dyn HostCall) -> BootstrapReport {
        let mut report = BootstrapReport::default();

        let dir = self
            .install_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        for file_name in SIBLING_MODULES {
            let path = dir.join(file_name);
            match host.load_module(&path) {
                Ok(()) => {
                    self.loaded.push(path.clone());
                    report.loaded.push(path);
                }
                Err(e) => report.warnings.push(ModuleLoadWarning {
                    path,
                    message: e.to_string(),
                }),
            }
        }

        for name in REQUIRED_FUNCTIONS {
            match self.table.resolve(host, name) {
                Ok(_) => report.resolved += 1,
                Err(_) => report.unresolved.push(name.to_string()),
            }
        }

        report
    }

    /// Best-effort unload of the siblings this bootstrap loaded.
    pub fn shutdown(&mut self, host: &dyn HostCall) -> Vec<ModuleLoadWarning> {
        let mut warnings = Vec::new();
        for path in self.loaded.drain(..) {
            if let Err(e) = host.unload_module(&path) {
                warnings.push(ModuleLoadWarning {
                    path,
                    message: e.to_string(),
                });
            }
        }
        warnings
    }
}
