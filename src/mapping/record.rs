use serde_json::{Map, Value};

use crate::error::MapperError;

use super::decoder::Draft;

/// One field's contribution to an encode call.
///
/// `Shared` carries a caller-computed identity (typically
/// `Rc::as_ptr(..) as usize`) so repeated references to the same object
/// within one top-level encode can be replaced by an identity-key stub.
pub enum FieldValue<'a> {
    /// Unset or null; dropped unless the rule says `include_null`.
    Absent,
    /// A ready tree value.
    Value(Value),
    /// A nested record, encoded with its own rule table.
    Nested(&'a dyn RecordSource),
    /// A nested record reachable through shared ownership.
    Shared {
        identity: usize,
        record: &'a dyn RecordSource,
    },
    /// An ordered sequence of field values.
    List(Vec<FieldValue<'a>>),
}

impl FieldValue<'_> {
    /// Maps an optional scalar, turning `None` into `Absent`.
    pub fn opt<T: Into<Value>>(value: Option<T>) -> Self {
        match value {
            Some(value) => FieldValue::Value(value.into()),
            None => FieldValue::Absent,
        }
    }
}

impl<T: Into<Value>> From<T> for FieldValue<'_> {
    fn from(value: T) -> Self {
        FieldValue::Value(value.into())
    }
}

/// An encodable record.
///
/// Implementations carry one `field` arm per logical field, formatting
/// any custom primitive representations (dates and the like) while
/// producing the [`FieldValue`].
pub trait RecordSource {
    /// Name of the rule table this record encodes with. For sum-type
    /// variants this is the concrete variant's table.
    fn record_type(&self) -> &'static str;

    /// Reads one logical field by its source field id.
    fn field(&self, id: &str) -> FieldValue<'_>;

    /// Captured unknown keys, re-emitted additively at top level.
    fn extra(&self) -> Option<&Map<String, Value>> {
        None
    }
}

/// A decodable record, finalized from a [`Draft`] in one construction
/// step after all input keys have been staged.
pub trait RecordTarget: Sized {
    /// Name of the rule table this record decodes with. For sum types
    /// this is the base table carrying the discriminator.
    const RECORD_TYPE: &'static str;

    fn from_draft(draft: &mut Draft<'_>) -> Result<Self, MapperError>;
}
