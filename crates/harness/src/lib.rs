// Diagnostic harness for host thread-safety guarantees: cross-module
// dispatch, nested/comparative orchestration, module bootstrap, and an
// in-process simulated host for driving it all from tests.

pub mod bootstrap;
pub mod dispatch;
pub mod modules;
pub mod orchestrator;
pub mod sim;

pub use bootstrap::{Bootstrap, BootstrapReport, ModuleLoadWarning};
pub use dispatch::Dispatcher;
pub use orchestrator::{Implementation, Orchestrator, PerformanceSample};
pub use sim::SimHost;
