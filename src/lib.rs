#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # JSON Mapper for Rust

 A declarative JSON object mapping and streaming codec toolkit: a
 bidirectional codec between typed in-memory records and JSON
 text/bytes/streams, driven by explicit per-field rules instead of
 runtime reflection, plus a token-level streaming interface for inputs
 and outputs larger than memory.

 ## Core Concepts

 - **Rule Table:** per-record-type declarative metadata: wire-name
   renaming, input aliases, visibility (write-only fields), role views,
   null inclusion, emission order, nested flattening, identity keys and
   the unknown-field policy. Built once at startup, immutable afterwards.
 - **Mapper:** owns every rule table plus the polymorphic tag registry
   and performs encoding and decoding. Stateless and safe for concurrent
   read-only use; all per-call state is transient.
 - **RecordSource / RecordTarget:** the two small traits a record type
   implements to plug into the engine, one field accessor for encoding and
   one two-phase finalize for decoding.
 - **Tree:** an ordered [`serde_json::Value`] document model with
   missing-sentinel navigation, pointer lookup and defaulted coercions.
 - **Streaming codec:** forward-only token reader and writer with
   subtree skip and stream-to-stream copy, and NDJSON flows (generate,
   filter, aggregate, convert) that hold constant working memory
   regardless of input size.

 ## Getting Started

```rust
use json_mapper_rs::mapping::record::{FieldValue, RecordSource, RecordTarget};
use json_mapper_rs::mapping::rule::{FieldRule, RuleTable, Visibility};
use json_mapper_rs::mapping::{Draft, EncodeOptions, Mapper};
use json_mapper_rs::MapperError;

#[derive(Debug, PartialEq)]
struct User {
    id: i64,
    username: String,
    password: Option<String>,
}

impl RecordSource for User {
    fn record_type(&self) -> &'static str {
        "User"
    }

    fn field(&self, id: &str) -> FieldValue<'_> {
        match id {
            "id" => self.id.into(),
            "username" => self.username.as_str().into(),
            "password" => FieldValue::opt(self.password.as_deref()),
            _ => FieldValue::Absent,
        }
    }
}

impl RecordTarget for User {
    const RECORD_TYPE: &'static str = "User";

    fn from_draft(draft: &mut Draft<'_>) -> Result<Self, MapperError> {
        Ok(User {
            id: draft.require_i64("id")?,
            username: draft.require_string("username")?,
            password: draft.take_string("password"),
        })
    }
}

fn main() -> Result<(), MapperError> {
    let mapper = Mapper::builder()
        .table(
            RuleTable::builder("User")
                .rule(FieldRule::new("id", "user_id"))
                .rule(FieldRule::new("username", "username").alias("login"))
                .rule(FieldRule::new("password", "password").visibility(Visibility::DecodeOnly))
                .build()?,
        )
        .build()?;

    let user = User {
        id: 7,
        username: "alpha".to_owned(),
        password: Some("secret".to_owned()),
    };

    // The write-only password never reaches the wire.
    let json = mapper.encode_to_string(&user, &EncodeOptions::new())?;
    assert_eq!(json, r#"{"user_id":7,"username":"alpha"}"#);

    // Aliases are accepted on input.
    let decoded: User = mapper.decode_str(r#"{"user_id":7,"login":"alpha"}"#)?;
    assert_eq!(decoded.username, "alpha");

    Ok(())
}
```

 For very large documents, drive the streaming codec in
 [`stream`] token-by-token instead of materializing a tree.

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
 -   MIT license

 at your option.
 */

/// Error types for mapping and streaming operations.
pub mod error;

#[doc(inline)]
pub use error::*;

/// Declarative record mapping: rule tables, encoder, decoder, registry.
pub mod mapping;

/// Token-level streaming reader/writer and NDJSON flows.
pub mod stream;

/// Ordered tree model with safe navigation.
pub mod tree;

pub use mapping::{Draft, EncodeOptions, Mapper, MapperBuilder};
pub use stream::{
    FilterSummary, JsonStreamReader, JsonStreamWriter, NdjsonReader, NdjsonWriter, Token,
};
pub use tree::{Node, StringifyOptions, ValueExt};
