// Host boundary: the types and trait through which extension code talks to
// the spreadsheet-automation host. The host itself is an external collaborator;
// everything here is the wire across that seam.

pub mod api;
pub mod descriptor;
pub mod handle;
pub mod thread;
pub mod value;

pub use api::{CallContext, HostCall, HostError};
pub use descriptor::FunctionSpec;
pub use handle::FunctionHandle;
pub use thread::ThreadSample;
pub use value::Value;
