//! Token-level streaming codec for inputs and outputs larger than memory.
//!
//! Both directions share one token model: a document is a flat sequence
//! of [`Token`]s. The reader advances strictly forward over an open byte
//! stream with memory bounded by the longest scalar token; the writer
//! emits tokens with automatic separator management and no nesting
//! validation. Constant working memory regardless of total stream size is
//! the one performance invariant every path in this module preserves.

use serde_json::Value;

/// NDJSON line processing and the file-to-file flows built on it.
pub mod ndjson;

/// Forward-only token reader.
pub mod reader;

/// Token writer.
pub mod writer;

pub use ndjson::{FilterSummary, NdjsonReader, NdjsonWriter};
pub use reader::JsonStreamReader;
pub use writer::JsonStreamWriter;

/// One structural or scalar event in a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    /// An object member name; the member's value follows as the next
    /// token (or token subtree).
    FieldName(String),
    /// A null, boolean, number or string value.
    Scalar(Value),
}
