use serde::{Deserialize, Serialize};

/// Metadata a function declares to the host at registration.
///
/// The `thread_safe` flag is what the host consults when deciding whether a
/// function is eligible for multi-threaded recalculation. Functions that
/// leave it false are serialized by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub thread_safe: bool,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, thread_safe: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            thread_safe,
        }
    }
}
