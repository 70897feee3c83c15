//! Cross-module dispatcher.
//!
//! Resolves a function name to its host handle via the registration table and
//! invokes the host's generic call-by-handle primitive. This is the single
//! synchronization point with the host's call machinery; it takes no locks of
//! its own beyond what the table requires, and it never holds one across the
//! host call.
//!
//! Every host fault is normalized into a textual result of the form
//! `Error:<message>` rather than propagated: an uncaught fault inside a
//! host-invoked function can destabilize the host, and aggregating callers
//! must be able to continue and report partial results.

use std::sync::Arc;

use gridprobe_host::{FunctionHandle, HostCall, Value};
use gridprobe_registry::RegistrationTable;

#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<RegistrationTable>,
}

impl Dispatcher {
    /// The table is injected, not globally reached, so tests can mock it.
    pub fn new(table: Arc<RegistrationTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RegistrationTable {
        &self.table
    }

    /// Invoke by handle. The preferred path: stable, no re-resolution, and no
    /// risk of the host re-entrantly evaluating a name mid-call.
    pub fn invoke_handle(&self, host: &dyn HostCall, handle: FunctionHandle, args: &[Value]) -> Value {
        match host.invoke(handle, args) {
            Ok(value) => value,
            Err(e) => Value::Text(format!("Error:{e}")),
        }
    }

    /// Invoke by name through the non-populating `try_get` path.
    ///
    /// This is the only name lookup permitted once steady-state dispatch has
    /// begun: an unregistered name fails loudly instead of triggering a host
    /// round-trip from inside a possibly-nested call.
    pub fn invoke_registered(&self, host: &dyn HostCall, name: &str, args: &[Value]) -> Value {
        match self.table.try_get(name) {
            Some(handle) => self.invoke_handle(host, handle, args),
            None => Value::Text(format!("Error:unresolved name '{name}'")),
        }
    }

    /// Invoke by name, resolving (and caching) through the host if needed.
    ///
    /// Only for outermost call sites, where re-entrancy risk is absent.
    pub fn invoke_by_name(&self, host: &dyn HostCall, name: &str, args: &[Value]) -> Value {
        match self.table.resolve(host, name) {
            Ok(handle) => self.invoke_handle(host, handle, args),
            Err(e) => Value::Text(format!("Error:{e}")),
        }
    }
}
