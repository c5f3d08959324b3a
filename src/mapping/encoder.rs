use std::collections::HashSet;

use log::debug;
use serde_json::{Map, Value};

use crate::error::MapperError;

use super::mapper::{EncodeOptions, Mapper};
use super::record::{FieldValue, RecordSource};
use super::rule::Visibility;

/// Transient per-call state: identities already emitted in full during
/// this top-level encode. Discarded when the call returns.
struct EncodeState {
    seen: HashSet<usize>,
}

impl Mapper {
    pub(crate) fn encode_root(
        &self,
        record: &dyn RecordSource,
        options: &EncodeOptions,
    ) -> Result<Value, MapperError> {
        debug!("encode {}", record.record_type());
        let mut state = EncodeState {
            seen: HashSet::new(),
        };
        self.encode_record(record, options.view.as_deref(), &mut state)
    }

    fn encode_record(
        &self,
        record: &dyn RecordSource,
        view: Option<&str>,
        state: &mut EncodeState,
    ) -> Result<Value, MapperError> {
        let table = self.table(record.record_type())?;
        let mut out = Map::new();

        // The discriminator leads the type's own fields.
        if let Some(property) = table.discriminator() {
            let tag = self.registry.tag_for(record.record_type())?;
            out.insert(property.to_owned(), Value::String(tag.to_owned()));
        }

        for rule in table.rules() {
            if rule.visibility_mode() == Visibility::DecodeOnly {
                continue;
            }
            if !table.view_allows(view, rule) {
                continue;
            }

            let field = record.field(rule.field());

            if let Some(prefix) = rule.unwrap_prefix() {
                self.encode_unwrapped(field, prefix, view, state, &mut out)?;
                continue;
            }

            match self.encode_field(field, view, state)? {
                Some(value) => {
                    out.insert(rule.wire().to_owned(), value);
                }
                None => {
                    if rule.includes_null() {
                        out.insert(rule.wire().to_owned(), Value::Null);
                    }
                }
            }
        }

        // Captured unknown keys merge additively at top level; a key that
        // collides with an already emitted wire name is dropped.
        if let Some(extra) = record.extra() {
            for (key, value) in extra {
                out.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        Ok(Value::Object(out))
    }

    /// Encodes one field value; `None` means absent/null, which the
    /// caller resolves against the rule's null policy.
    fn encode_field(
        &self,
        field: FieldValue<'_>,
        view: Option<&str>,
        state: &mut EncodeState,
    ) -> Result<Option<Value>, MapperError> {
        match field {
            FieldValue::Absent | FieldValue::Value(Value::Null) => Ok(None),
            FieldValue::Value(value) => Ok(Some(value)),
            FieldValue::Nested(record) => Ok(Some(self.encode_record(record, view, state)?)),
            FieldValue::Shared { identity, record } => {
                Ok(Some(self.encode_shared(identity, record, view, state)?))
            }
            FieldValue::List(items) => {
                let mut array = Vec::with_capacity(items.len());
                for item in items {
                    // Inside an array an absent element stays an explicit null.
                    array.push(self.encode_field(item, view, state)?.unwrap_or(Value::Null));
                }
                Ok(Some(Value::Array(array)))
            }
        }
    }

    /// First occurrence of an identity emits the full body; every later
    /// occurrence of the same identity in this call emits only the
    /// identity-key stub.
    fn encode_shared(
        &self,
        identity: usize,
        record: &dyn RecordSource,
        view: Option<&str>,
        state: &mut EncodeState,
    ) -> Result<Value, MapperError> {
        let table = self.table(record.record_type())?;
        let Some(identity_rule) = table.identity_rule() else {
            return self.encode_record(record, view, state);
        };

        if state.seen.insert(identity) {
            return self.encode_record(record, view, state);
        }

        debug!(
            "repeated reference to {}, emitting identity stub",
            record.record_type()
        );
        let key = self
            .encode_field(record.field(identity_rule.field()), view, state)?
            .unwrap_or(Value::Null);
        let mut stub = Map::new();
        stub.insert(identity_rule.wire().to_owned(), key);
        Ok(Value::Object(stub))
    }

    /// Flattens a nested record (or a prebuilt object) into the parent,
    /// prefixing every child wire name.
    fn encode_unwrapped(
        &self,
        field: FieldValue<'_>,
        prefix: &str,
        view: Option<&str>,
        state: &mut EncodeState,
        out: &mut Map<String, Value>,
    ) -> Result<(), MapperError> {
        let nested = match self.encode_field(field, view, state)? {
            Some(value) => value,
            None => return Ok(()),
        };
        match nested {
            Value::Object(map) => {
                for (key, value) in map {
                    out.insert(format!("{prefix}{key}"), value);
                }
                Ok(())
            }
            other => Err(MapperError::mismatch("object", &other)),
        }
    }
}
