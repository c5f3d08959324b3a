use std::collections::HashMap;

use crate::error::MapperError;

/// Maps discriminator tags to concrete record types and back.
///
/// Registration is one-to-one in both directions and happens once during
/// process initialization; a lookup failure on decode is a data error
/// ([`MapperError::UnknownVariant`]), not a registry error.
#[derive(Debug, Default)]
pub struct PolymorphicRegistry {
    by_tag: HashMap<String, String>,
    by_type: HashMap<String, String>,
}

impl PolymorphicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        tag: impl Into<String>,
        record_type: impl Into<String>,
    ) -> Result<(), MapperError> {
        let tag = tag.into();
        let record_type = record_type.into();

        if self.by_tag.contains_key(&tag) {
            return Err(MapperError::Configuration {
                record: record_type,
                message: format!("tag '{tag}' is already registered"),
            });
        }
        if self.by_type.contains_key(&record_type) {
            return Err(MapperError::Configuration {
                record: record_type.clone(),
                message: "record type is already registered under another tag".to_owned(),
            });
        }

        self.by_tag.insert(tag.clone(), record_type.clone());
        self.by_type.insert(record_type, tag);
        Ok(())
    }

    /// Concrete record type for a wire tag.
    pub fn resolve(&self, tag: &str) -> Result<&str, MapperError> {
        self.by_tag
            .get(tag)
            .map(String::as_str)
            .ok_or_else(|| MapperError::UnknownVariant(tag.to_owned()))
    }

    /// Wire tag for a concrete record type.
    pub fn tag_for(&self, record_type: &str) -> Result<&str, MapperError> {
        self.by_type
            .get(record_type)
            .map(String::as_str)
            .ok_or_else(|| MapperError::UnknownVariant(record_type.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_one_to_one() {
        let mut registry = PolymorphicRegistry::new();
        registry.register("dog", "Dog").unwrap();
        registry.register("cat", "Cat").unwrap();

        assert!(matches!(
            registry.register("dog", "Wolf"),
            Err(MapperError::Configuration { .. })
        ));
        assert!(matches!(
            registry.register("puppy", "Dog"),
            Err(MapperError::Configuration { .. })
        ));
    }

    #[test]
    fn lookups_resolve_both_directions() {
        let mut registry = PolymorphicRegistry::new();
        registry.register("dog", "Dog").unwrap();

        assert_eq!(registry.resolve("dog").unwrap(), "Dog");
        assert_eq!(registry.tag_for("Dog").unwrap(), "dog");
        assert!(matches!(
            registry.resolve("fish"),
            Err(MapperError::UnknownVariant(tag)) if tag == "fish"
        ));
    }
}
