use thiserror::Error;

/// Errors raised by the mapping engine and the streaming codec.
///
/// Structural errors (malformed text, type mismatches, unknown variants,
/// missing required fields) always propagate to the caller: they indicate
/// corrupt or incompatible data and are never silently recovered. A failed
/// call leaves the rule tables and the polymorphic registry untouched and
/// usable for subsequent calls.
#[derive(Error, Debug)]
pub enum MapperError {
    /// Malformed JSON text, with the position reported by the parser.
    #[error("JSON parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// An operation required an Object or Array but found something else.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Strict decoding saw a key with no matching rule.
    #[error("unknown field: {0}")]
    UnknownField(String),

    /// A discriminator tag with no registered variant.
    #[error("unknown variant tag: {0}")]
    UnknownVariant(String),

    /// Two-phase construction finished with a required field unset.
    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    /// Invalid rule table or registry configuration, detected at
    /// registration time rather than at call time.
    #[error("invalid configuration for {record}: {message}")]
    Configuration { record: String, message: String },

    /// Stream or file read/write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MapperError {
    /// Converts a `serde_json` error, keeping its reported position.
    pub(crate) fn from_json(error: serde_json::Error) -> Self {
        MapperError::Parse {
            line: error.line(),
            column: error.column(),
            message: error.to_string(),
        }
    }

    pub(crate) fn mismatch(expected: &'static str, value: &serde_json::Value) -> Self {
        MapperError::TypeMismatch {
            expected,
            found: kind_name(value),
        }
    }
}

pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
