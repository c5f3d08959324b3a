use std::collections::HashMap;
use std::io::{Read, Write};

use serde_json::Value;

use crate::error::MapperError;
use crate::tree::{self, StringifyOptions};

use super::record::{RecordSource, RecordTarget};
use super::registry::PolymorphicRegistry;
use super::rule::RuleTable;

/// Per-call encoding options.
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    pub view: Option<String>,
    pub pretty: bool,
    pub sort_keys: bool,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a view; only untagged fields and fields whose tags fall
    /// inside the view's declared closure are emitted.
    pub fn view(mut self, tag: impl Into<String>) -> Self {
        self.view = Some(tag.into());
        self
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn sort_keys(mut self) -> Self {
        self.sort_keys = true;
        self
    }

    pub(crate) fn stringify(&self) -> StringifyOptions {
        StringifyOptions {
            pretty: self.pretty,
            sort_keys: self.sort_keys,
        }
    }
}

/// The configured mapping engine: every rule table plus the polymorphic
/// registry, immutable once built and safe to share across threads.
///
/// ```
/// use json_mapper_rs::mapping::{Mapper, rule::{FieldRule, RuleTable}};
///
/// let mapper = Mapper::builder()
///     .table(
///         RuleTable::builder("User")
///             .rule(FieldRule::new("id", "user_id"))
///             .rule(FieldRule::new("username", "username").alias("login"))
///             .build()?,
///     )
///     .build()?;
/// # Ok::<(), json_mapper_rs::MapperError>(())
/// ```
#[derive(Debug)]
pub struct Mapper {
    pub(crate) tables: HashMap<String, RuleTable>,
    pub(crate) registry: PolymorphicRegistry,
}

impl Mapper {
    pub fn builder() -> MapperBuilder {
        MapperBuilder {
            tables: Vec::new(),
            variants: Vec::new(),
        }
    }

    pub fn registry(&self) -> &PolymorphicRegistry {
        &self.registry
    }

    /// The rule table registered for a record type.
    pub fn table(&self, record_type: &str) -> Result<&RuleTable, MapperError> {
        self.tables
            .get(record_type)
            .ok_or_else(|| MapperError::Configuration {
                record: record_type.to_owned(),
                message: "no rule table registered".to_owned(),
            })
    }

    /// Encodes a record into a tree value.
    pub fn encode(
        &self,
        record: &dyn RecordSource,
        options: &EncodeOptions,
    ) -> Result<Value, MapperError> {
        self.encode_root(record, options)
    }

    /// Encodes a record into JSON text.
    pub fn encode_to_string(
        &self,
        record: &dyn RecordSource,
        options: &EncodeOptions,
    ) -> Result<String, MapperError> {
        let value = self.encode(record, options)?;
        tree::to_string(&value, &options.stringify())
    }

    /// Encodes a record into UTF-8 bytes.
    pub fn encode_to_vec(
        &self,
        record: &dyn RecordSource,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, MapperError> {
        Ok(self.encode_to_string(record, options)?.into_bytes())
    }

    /// Encodes a record and writes the bytes out as-is. A failed write
    /// surfaces the I/O error and leaves whatever was written in place.
    pub fn encode_to_writer<W: Write>(
        &self,
        record: &dyn RecordSource,
        options: &EncodeOptions,
        mut writer: W,
    ) -> Result<(), MapperError> {
        let bytes = self.encode_to_vec(record, options)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Decodes JSON text into a record.
    pub fn decode_str<T: RecordTarget>(&self, text: &str) -> Result<T, MapperError> {
        self.decode_value(tree::parse(text)?)
    }

    /// Decodes an already parsed tree into a record.
    pub fn decode_value<T: RecordTarget>(&self, value: Value) -> Result<T, MapperError> {
        self.decode_root(value)
    }

    /// Reads a whole document from `reader` and decodes it. For inputs
    /// larger than memory use the streaming codec instead.
    pub fn decode_reader<T: RecordTarget>(&self, mut reader: impl Read) -> Result<T, MapperError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.decode_str(&text)
    }
}

/// Builder assembling the mapper during process initialization.
pub struct MapperBuilder {
    tables: Vec<RuleTable>,
    variants: Vec<(String, String)>,
}

impl MapperBuilder {
    pub fn table(mut self, table: RuleTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Registers a sum-type variant: `tag` on the wire, `record_type`'s
    /// rule table in memory.
    pub fn variant(mut self, tag: impl Into<String>, record_type: impl Into<String>) -> Self {
        self.variants.push((tag.into(), record_type.into()));
        self
    }

    pub fn build(self) -> Result<Mapper, MapperError> {
        let mut tables = HashMap::new();
        for table in self.tables {
            let record_type = table.record_type().to_owned();
            if tables.insert(record_type.clone(), table).is_some() {
                return Err(MapperError::Configuration {
                    record: record_type,
                    message: "rule table registered twice".to_owned(),
                });
            }
        }

        let mut registry = PolymorphicRegistry::new();
        for (tag, record_type) in self.variants {
            if !tables.contains_key(&record_type) {
                return Err(MapperError::Configuration {
                    record: record_type,
                    message: format!("variant tag '{tag}' points at an unregistered table"),
                });
            }
            registry.register(tag, record_type)?;
        }

        Ok(Mapper { tables, registry })
    }
}
