use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;
use serde_json::{Map, Value};

use crate::error::MapperError;

use super::mapper::Mapper;
use super::record::RecordTarget;
use super::rule::UnknownFieldPolicy;

/// Transient per-call state: the full bodies of identity-bearing objects
/// already decoded in this top-level call, keyed by record type and the
/// canonical text of the identity value.
#[derive(Default)]
struct DecodeState {
    bodies: HashMap<(String, String), Map<String, Value>>,
}

impl Mapper {
    pub(crate) fn decode_root<T: RecordTarget>(&self, value: Value) -> Result<T, MapperError> {
        debug!("decode {}", T::RECORD_TYPE);
        let state = RefCell::new(DecodeState::default());
        self.decode_with(value, &state)
    }

    fn decode_with<'a, T: RecordTarget>(
        &'a self,
        value: Value,
        state: &'a RefCell<DecodeState>,
    ) -> Result<T, MapperError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(MapperError::mismatch("object", &other)),
        };

        let base = self.table(T::RECORD_TYPE)?;

        // Discriminator-bearing targets resolve the concrete variant
        // table first, then decode the remaining keys against it.
        let (table, variant_tag) = match base.discriminator() {
            Some(property) => {
                let tag = match map.shift_remove(property) {
                    Some(Value::String(tag)) => tag,
                    Some(other) => return Err(MapperError::mismatch("string", &other)),
                    None => {
                        return Err(MapperError::MissingRequiredField(property.to_owned()));
                    }
                };
                let record_type = self.registry.resolve(&tag)?;
                (self.table(record_type)?, Some(tag))
            }
            None => (base, None),
        };

        // Identity handling: a lone identity key that was seen before is
        // a reference stub and expands to a copy of the first full body.
        if let Some(identity_rule) = table.identity_rule() {
            if let Some(identity) = map.get(identity_rule.wire()) {
                let key = (table.record_type().to_owned(), canonical(identity)?);
                let mut state = state.borrow_mut();
                if map.len() == 1 {
                    if let Some(body) = state.bodies.get(&key) {
                        debug!("expanding identity stub for {}", table.record_type());
                        map = body.clone();
                    }
                } else {
                    state.bodies.insert(key, map.clone());
                }
            }
        }

        let mut draft = Draft {
            mapper: self,
            state,
            record_type: table.record_type().to_owned(),
            variant_tag,
            values: Map::new(),
            extra: Map::new(),
        };

        for (key, value) in map {
            // A variant body may repeat its own discriminator property.
            if table.discriminator() == Some(key.as_str()) {
                continue;
            }
            if let Some(rule) = table.rule_for_key(&key) {
                draft.values.insert(rule.field().to_owned(), value);
            } else if let Some((rule, stripped)) = table.rule_for_prefix(&key) {
                let nested = draft
                    .values
                    .entry(rule.field().to_owned())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(nested) = nested {
                    nested.insert(stripped.to_owned(), value);
                }
            } else {
                match table.unknown_fields() {
                    UnknownFieldPolicy::Fail => return Err(MapperError::UnknownField(key)),
                    UnknownFieldPolicy::Ignore => {}
                    UnknownFieldPolicy::Capture => {
                        draft.extra.insert(key, value);
                    }
                }
            }
        }

        T::from_draft(&mut draft)
    }
}

fn canonical(value: &Value) -> Result<String, MapperError> {
    serde_json::to_string(value).map_err(MapperError::from_json)
}

/// Staging area for one record's input, handed to
/// [`RecordTarget::from_draft`] for the single finalize step.
///
/// `take_*` accessors remove a staged value and coerce it; `require_*`
/// variants turn an unset field into
/// [`MapperError::MissingRequiredField`].
pub struct Draft<'a> {
    mapper: &'a Mapper,
    state: &'a RefCell<DecodeState>,
    record_type: String,
    variant_tag: Option<String>,
    values: Map<String, Value>,
    extra: Map<String, Value>,
}

impl Draft<'_> {
    /// Concrete record type this draft was staged against (the resolved
    /// variant for discriminator-bearing targets).
    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// The discriminator tag read from the input, if any.
    pub fn variant_tag(&self) -> Option<&str> {
        self.variant_tag.as_deref()
    }

    /// Removes a staged value. Explicit `null` counts as unset.
    pub fn take(&mut self, field: &str) -> Option<Value> {
        self.values.shift_remove(field).filter(|v| !v.is_null())
    }

    pub fn take_string(&mut self, field: &str) -> Option<String> {
        match self.take(field)? {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    pub fn take_i64(&mut self, field: &str) -> Option<i64> {
        match self.take(field)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|f| f as i64)),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn take_f64(&mut self, field: &str) -> Option<f64> {
        match self.take(field)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn take_bool(&mut self, field: &str) -> Option<bool> {
        match self.take(field)? {
            Value::Bool(flag) => Some(flag),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn require_string(&mut self, field: &str) -> Result<String, MapperError> {
        self.take_string(field)
            .ok_or_else(|| MapperError::MissingRequiredField(field.to_owned()))
    }

    pub fn require_i64(&mut self, field: &str) -> Result<i64, MapperError> {
        self.take_i64(field)
            .ok_or_else(|| MapperError::MissingRequiredField(field.to_owned()))
    }

    pub fn require_bool(&mut self, field: &str) -> Result<bool, MapperError> {
        self.take_bool(field)
            .ok_or_else(|| MapperError::MissingRequiredField(field.to_owned()))
    }

    /// Decodes a staged nested object against `T`'s rule table.
    ///
    /// Identity bookkeeping follows call order: a shared record's full
    /// body registers when it is taken, and a reference stub only
    /// expands against an already registered body. Impls must take
    /// identity-bearing fields in the order they appear in the input,
    /// body before stub; a stub taken first decodes as a bare
    /// single-key object and fails on its required fields.
    pub fn take_record<T: RecordTarget>(&mut self, field: &str) -> Result<Option<T>, MapperError> {
        match self.take(field) {
            None => Ok(None),
            Some(value) => self.mapper.decode_with(value, self.state).map(Some),
        }
    }

    /// Decodes a staged array of nested objects. Unset yields empty.
    pub fn take_record_list<T: RecordTarget>(
        &mut self,
        field: &str,
    ) -> Result<Vec<T>, MapperError> {
        match self.take(field) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| self.mapper.decode_with(item, self.state))
                .collect(),
            Some(other) => Err(MapperError::mismatch("array", &other)),
        }
    }

    /// Hands over the captured unknown keys, in input order.
    pub fn take_extra(&mut self) -> Map<String, Value> {
        std::mem::take(&mut self.extra)
    }
}
