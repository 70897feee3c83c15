//! In-process simulated host.
//!
//! Implements the `HostCall` boundary so registry, dispatcher, and
//! orchestrator invariants can be exercised without a live spreadsheet host:
//! handle assignment, module load/unload, re-entrant invoke, the per-function
//! thread-safety flag, and fan-out over worker threads.
//!
//! Lock discipline: no internal lock is held while a registered function body
//! runs, because bodies re-enter the host for nested dispatch. Functions
//! registered with `thread_safe = false` are serialized through a reentrant
//! mutex, mirroring a host that excludes them from multi-threaded
//! recalculation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};
use rustc_hash::FxHashMap;

use gridprobe_host::{
    CallContext, FunctionHandle, FunctionSpec, HostCall, HostError, ThreadSample, Value,
};

/// A registered function body. Receives the per-call context and the raw
/// argument list; returns a value or a host-level fault.
pub type HostFn = Arc<dyn Fn(&CallContext, &[Value]) -> Result<Value, HostError> + Send + Sync>;

#[derive(Clone)]
pub struct Registration {
    pub spec: FunctionSpec,
    pub body: HostFn,
}

impl Registration {
    pub fn new(
        spec: FunctionSpec,
        body: impl Fn(&CallContext, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            spec,
            body: Arc::new(body),
        }
    }
}

/// Everything an extension module registers when the host loads it.
#[derive(Clone, Default)]
pub struct ModuleDef {
    functions: Vec<Registration>,
}

impl ModuleDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        spec: FunctionSpec,
        body: impl Fn(&CallContext, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) {
        self.functions.push(Registration::new(spec, body));
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

struct ModuleSlot {
    def: ModuleDef,
    loaded: bool,
    /// (name, handle) pairs registered by the current load.
    registered: Vec<(String, FunctionHandle)>,
}

#[derive(Default)]
pub struct SimHost {
    names: RwLock<FxHashMap<String, FunctionHandle>>,
    functions: RwLock<FxHashMap<u64, Registration>>,
    modules: RwLock<FxHashMap<PathBuf, ModuleSlot>>,
    next_handle: AtomicU64,
    /// Serializes functions not flagged thread-safe. Reentrant so such a
    /// function may still nest into another one on the same thread.
    serial: ReentrantMutex<()>,
    /// Number of resolve-by-name round-trips served. Lets tests prove that
    /// steady-state dispatch never comes back to the host for names.
    resolves: AtomicU64,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a module available at `path` without loading it.
    pub fn install_module(&self, path: impl Into<PathBuf>, def: ModuleDef) {
        self.modules.write().insert(
            path.into(),
            ModuleSlot {
                def,
                loaded: false,
                registered: Vec::new(),
            },
        );
    }

    /// Register a single function directly (the loading module's own surface).
    pub fn register(&self, registration: Registration) -> FunctionHandle {
        let handle = FunctionHandle::from_raw(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.names
            .write()
            .insert(registration.spec.name.clone(), handle);
        self.functions.write().insert(handle.raw(), registration);
        handle
    }

    pub fn register_fn(
        &self,
        spec: FunctionSpec,
        body: impl Fn(&CallContext, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    ) -> FunctionHandle {
        self.register(Registration::new(spec, body))
    }

    /// Resolve round-trips served so far.
    pub fn resolve_count(&self) -> u64 {
        self.resolves.load(Ordering::SeqCst)
    }

    /// Fan calls out over one worker thread each, the way the host's recalc
    /// pool invokes independent cells. Returns results in call order.
    pub fn invoke_concurrent(
        &self,
        calls: Vec<(FunctionHandle, Vec<Value>)>,
    ) -> Vec<Result<Value, HostError>> {
        std::thread::scope(|scope| {
            let workers: Vec<_> = calls
                .into_iter()
                .map(|(handle, args)| scope.spawn(move || self.invoke(handle, &args)))
                .collect();
            workers
                .into_iter()
                .map(|w| w.join().expect("probe function panicked"))
                .collect()
        })
    }
}

impl HostCall for SimHost {
    fn resolve_name(&self, name: &str) -> Result<FunctionHandle, HostError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.names
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| HostError::UnknownName(name.to_string()))
    }

    fn invoke(&self, handle: FunctionHandle, args: &[Value]) -> Result<Value, HostError> {
        // Clone the registration out so no lock spans the body call.
        let registration = self
            .functions
            .read()
            .get(&handle.raw())
            .cloned()
            .ok_or(HostError::UnknownHandle(handle))?;

        let _serial = if registration.spec.thread_safe {
            None
        } else {
            Some(self.serial.lock())
        };

        // Sample at execution entry, after any serialization wait.
        let ctx = CallContext::new(ThreadSample::capture(), self);
        (registration.body)(&ctx, args)
    }

    fn load_module(&self, path: &Path) -> Result<(), HostError> {
        let mut modules = self.modules.write();
        let slot = modules
            .get_mut(path)
            .ok_or_else(|| HostError::ModuleNotFound(path.to_path_buf()))?;
        if slot.loaded {
            return Ok(());
        }

        {
            let names = self.names.read();
            for registration in &slot.def.functions {
                if names.contains_key(&registration.spec.name) {
                    return Err(HostError::ModuleFailed {
                        path: path.to_path_buf(),
                        message: format!(
                            "function '{}' already registered",
                            registration.spec.name
                        ),
                    });
                }
            }
        }

        for registration in slot.def.functions.clone() {
            let name = registration.spec.name.clone();
            let handle =
                FunctionHandle::from_raw(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
            self.names.write().insert(name.clone(), handle);
            self.functions.write().insert(handle.raw(), registration);
            slot.registered.push((name, handle));
        }
        slot.loaded = true;
        Ok(())
    }

    fn unload_module(&self, path: &Path) -> Result<(), HostError> {
        let mut modules = self.modules.write();
        let slot = modules
            .get_mut(path)
            .ok_or_else(|| HostError::ModuleNotFound(path.to_path_buf()))?;
        if !slot.loaded {
            return Ok(());
        }

        for (name, handle) in slot.registered.drain(..) {
            let mut names = self.names.write();
            // Only drop the name if it still points at this registration.
            if names.get(&name) == Some(&handle) {
                names.remove(&name);
            }
            self.functions.write().remove(&handle.raw());
        }
        slot.loaded = false;
        Ok(())
    }
}
