//! Tree model for ad-hoc JSON manipulation.
//!
//! The tree is a plain [`serde_json::Value`] (built with `preserve_order`,
//! so object keys keep insertion order and re-setting a key replaces in
//! place). What this module adds is the safe-navigation contract used
//! pervasively by callers: [`Node`] never panics and never errors while
//! walking a document, it only becomes *missing*, and every primitive
//! coercion takes a caller-supplied default instead of failing.

use serde_json::{Map, Value};

use crate::error::MapperError;

/// Parses JSON text into a tree.
///
/// Malformed input yields [`MapperError::Parse`] with the line and column
/// reported by the parser.
pub fn parse(text: &str) -> Result<Value, MapperError> {
    serde_json::from_str(text).map_err(MapperError::from_json)
}

/// Rendering options for [`to_string`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StringifyOptions {
    /// Two-space indented output.
    pub pretty: bool,
    /// Deterministic recursive key ordering instead of insertion order.
    pub sort_keys: bool,
}

impl StringifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    pub fn sort_keys(mut self) -> Self {
        self.sort_keys = true;
        self
    }
}

/// Renders a tree as JSON text.
pub fn to_string(value: &Value, options: &StringifyOptions) -> Result<String, MapperError> {
    let rendered = if options.sort_keys {
        let sorted = sorted_clone(value);
        serialize(&sorted, options.pretty)
    } else {
        serialize(value, options.pretty)
    };
    rendered.map_err(MapperError::from_json)
}

fn serialize(value: &Value, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

fn sorted_clone(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sorted_clone(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted_clone).collect()),
        other => other.clone(),
    }
}

/// A borrowed position in a tree, or the *missing* sentinel.
///
/// Navigation through a missing node stays missing; it is a value, not an
/// error. Obtain one with [`ValueExt::node`].
#[derive(Debug, Clone, Copy)]
pub struct Node<'a>(Option<&'a Value>);

impl<'a> Node<'a> {
    /// The missing sentinel.
    pub fn missing() -> Self {
        Node(None)
    }

    pub fn is_missing(&self) -> bool {
        self.0.is_none()
    }

    /// The underlying value, if this node is present.
    pub fn value(&self) -> Option<&'a Value> {
        self.0
    }

    /// Child of an object by key. Anything else yields missing.
    pub fn path(&self, key: &str) -> Node<'a> {
        match self.0 {
            Some(Value::Object(map)) => Node(map.get(key)),
            _ => Node(None),
        }
    }

    /// Element of an array by index. Anything else yields missing.
    pub fn index(&self, index: usize) -> Node<'a> {
        match self.0 {
            Some(Value::Array(items)) => Node(items.get(index)),
            _ => Node(None),
        }
    }

    /// Walks a `/`-separated pointer, e.g. `/meta/deep/0/field`.
    ///
    /// Unsigned-integer segments address array indices. Any broken
    /// segment yields the missing node.
    pub fn at(&self, pointer: &str) -> Node<'a> {
        let mut node = *self;
        for segment in pointer.split('/').filter(|s| !s.is_empty()) {
            node = match node.0 {
                Some(Value::Array(_)) => match segment.parse::<usize>() {
                    Ok(index) => node.index(index),
                    Err(_) => Node(None),
                },
                _ => node.path(segment),
            };
        }
        node
    }

    /// Text rendition of the node, falling back to `default` when the
    /// node is missing, null or a container. Numbers and booleans render
    /// as their text form.
    pub fn as_text(&self, default: &str) -> String {
        match self.0 {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            _ => default.to_owned(),
        }
    }

    /// Integer rendition with best-effort coercion: numbers truncate,
    /// numeric strings parse, booleans map to 1/0.
    pub fn as_i64(&self, default: i64) -> i64 {
        match self.0 {
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|f| f as i64))
                .unwrap_or(default),
            Some(Value::String(text)) => text
                .parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(default),
            Some(Value::Bool(flag)) => *flag as i64,
            _ => default,
        }
    }

    /// Floating-point rendition with the same coercions as [`Self::as_i64`].
    pub fn as_f64(&self, default: f64) -> f64 {
        match self.0 {
            Some(Value::Number(number)) => number.as_f64().unwrap_or(default),
            Some(Value::String(text)) => text.parse::<f64>().unwrap_or(default),
            Some(Value::Bool(flag)) => {
                if *flag {
                    1.0
                } else {
                    0.0
                }
            }
            _ => default,
        }
    }

    /// Boolean rendition: booleans pass through, `"true"`/`"false"`
    /// strings parse, non-zero numbers are true.
    pub fn as_bool(&self, default: bool) -> bool {
        match self.0 {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.parse::<bool>().unwrap_or(default),
            Some(Value::Number(number)) => number.as_f64().map(|f| f != 0.0).unwrap_or(default),
            _ => default,
        }
    }
}

impl<'a> From<&'a Value> for Node<'a> {
    fn from(value: &'a Value) -> Self {
        Node(Some(value))
    }
}

/// Navigation and mutation extensions on [`serde_json::Value`].
pub trait ValueExt {
    /// Safe-navigation entry point.
    fn node(&self) -> Node<'_>;

    /// Sets a key on an Object; an existing key is replaced in place.
    fn set_field(&mut self, key: &str, value: Value) -> Result<(), MapperError>;

    /// Removes a key from an Object, preserving the order of the rest.
    fn remove_field(&mut self, key: &str) -> Result<Option<Value>, MapperError>;

    /// Appends an element to an Array.
    fn push_element(&mut self, value: Value) -> Result<(), MapperError>;
}

impl ValueExt for Value {
    fn node(&self) -> Node<'_> {
        Node(Some(self))
    }

    fn set_field(&mut self, key: &str, value: Value) -> Result<(), MapperError> {
        match self {
            Value::Object(map) => {
                map.insert(key.to_owned(), value);
                Ok(())
            }
            other => Err(MapperError::mismatch("object", other)),
        }
    }

    fn remove_field(&mut self, key: &str) -> Result<Option<Value>, MapperError> {
        match self {
            Value::Object(map) => Ok(map.shift_remove(key)),
            other => Err(MapperError::mismatch("object", other)),
        }
    }

    fn push_element(&mut self, value: Value) -> Result<(), MapperError> {
        match self {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(MapperError::mismatch("array", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::MapperError;

    fn sample() -> Value {
        parse(
            r#"{
              "name": "Narayana",
              "age": 30,
              "address": { "city": "Bangalore", "country": "India" },
              "hobbies": ["chess", "coding", "travel"],
              "meta": { "deep": { "field": "value123" } }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn parse_reports_position_of_malformed_text() {
        let error = parse("{\"a\": }").unwrap_err();
        match error {
            MapperError::Parse { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_navigation_never_raises() {
        let root = sample();
        let node = root.node().path("unknown").path("deeper").index(3);
        assert!(node.is_missing());
        assert_eq!(node.as_text("fallback"), "fallback");
        assert_eq!(node.as_i64(-1), -1);
    }

    #[test]
    fn pointer_walks_objects_and_arrays() {
        let root = sample();
        assert_eq!(root.node().at("/address/city").as_text(""), "Bangalore");
        assert_eq!(root.node().at("/hobbies/1").as_text(""), "coding");
        assert_eq!(root.node().at("/meta/deep/field").as_text(""), "value123");
        assert!(root.node().at("/meta/deep/absent/0").is_missing());
        assert!(root.node().at("/hobbies/9").is_missing());
    }

    #[test]
    fn coercions_fall_back_to_defaults() {
        let root = json!({"count": "42", "ratio": 0.5, "flag": "true", "level": 2});
        assert_eq!(root.node().path("count").as_i64(0), 42);
        assert_eq!(root.node().path("ratio").as_f64(0.0), 0.5);
        assert!(root.node().path("flag").as_bool(false));
        assert!(root.node().path("level").as_bool(false));
        assert_eq!(root.node().path("count").as_text(""), "42");
        assert_eq!(root.node().path("missing").as_f64(9.9), 9.9);
    }

    #[test]
    fn mutation_requires_matching_container() {
        let mut root = sample();
        root.set_field("age", json!(31)).unwrap();
        assert_eq!(root.node().path("age").as_i64(0), 31);

        let removed = root.remove_field("name").unwrap();
        assert_eq!(removed, Some(json!("Narayana")));

        let mut scalar = json!(12);
        assert!(matches!(
            scalar.set_field("x", json!(1)),
            Err(MapperError::TypeMismatch { expected: "object", .. })
        ));
        assert!(matches!(
            scalar.push_element(json!(1)),
            Err(MapperError::TypeMismatch { expected: "array", .. })
        ));
    }

    #[test]
    fn insertion_order_is_preserved_and_resetting_replaces() {
        let mut root = json!({});
        root.set_field("b", json!(1)).unwrap();
        root.set_field("a", json!(2)).unwrap();
        root.set_field("b", json!(3)).unwrap();
        let text = to_string(&root, &StringifyOptions::new()).unwrap();
        assert_eq!(text, r#"{"b":3,"a":2}"#);
    }

    #[test]
    fn sorted_pretty_rendering_is_deterministic() {
        let root = json!({"b": {"y": 1, "x": 2}, "a": [1, 2]});
        let text = to_string(&root, &StringifyOptions::new().pretty().sort_keys()).unwrap();
        let expected = "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": {\n    \"x\": 2,\n    \"y\": 1\n  }\n}";
        assert_eq!(text, expected);
    }
}
