use serde::{Deserialize, Serialize};

use crate::api::HostError;

/// Argument/result value crossing the host call boundary.
///
/// Explicit tagged union rather than an untyped dynamic value: the host's
/// invoke primitive forwards these as-is, and probe wrappers unpack them with
/// the `as_*` accessors (which produce typed argument errors instead of
/// silent coercions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    /// Two-dimensional array, row-major. Multi-valued return path.
    Array(Vec<Vec<Value>>),
    /// Host-level error marker (e.g. the host's own #VALUE! analog).
    Error(String),
}

impl Value {
    /// Build a vertical vector (n rows, one column).
    pub fn column(values: Vec<f64>) -> Self {
        Value::Array(values.into_iter().map(|v| vec![Value::Number(v)]).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Error(_) => "error",
        }
    }

    pub fn as_number(&self, index: usize) -> Result<f64, HostError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(HostError::ArgType {
                index,
                expected: "number",
                got: other.type_name(),
            }),
        }
    }

    pub fn as_bool(&self, index: usize) -> Result<bool, HostError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(HostError::ArgType {
                index,
                expected: "bool",
                got: other.type_name(),
            }),
        }
    }

    pub fn as_text(&self, index: usize) -> Result<&str, HostError> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(HostError::ArgType {
                index,
                expected: "text",
                got: other.type_name(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Array(rows) => {
                write!(f, "[")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    for (j, v) in row.iter().enumerate() {
                        if j > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{v}")?;
                    }
                }
                write!(f, "]")
            }
            Value::Error(e) => write!(f, "#ERR:{e}"),
        }
    }
}
