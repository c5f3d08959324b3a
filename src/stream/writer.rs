use std::io::Write;

use serde_json::Value;

use crate::error::MapperError;

/// Token writer over an open byte stream.
///
/// Separators (commas, colons) are managed automatically; nesting
/// balance is NOT validated. The caller is responsible for matching
/// starts and ends: a malformed call sequence produces malformed
/// output, detected only by a downstream parser.
pub struct JsonStreamWriter<W: Write> {
    out: W,
    /// One entry per open container: whether it has members already.
    stack: Vec<bool>,
    /// A member name was just written; suppress the next separator.
    after_name: bool,
}

impl<W: Write> JsonStreamWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            stack: Vec::new(),
            after_name: false,
        }
    }

    pub fn start_object(&mut self) -> Result<(), MapperError> {
        self.before_value()?;
        self.out.write_all(b"{")?;
        self.stack.push(false);
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<(), MapperError> {
        self.stack.pop();
        self.out.write_all(b"}")?;
        Ok(())
    }

    pub fn start_array(&mut self) -> Result<(), MapperError> {
        self.before_value()?;
        self.out.write_all(b"[")?;
        self.stack.push(false);
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<(), MapperError> {
        self.stack.pop();
        self.out.write_all(b"]")?;
        Ok(())
    }

    /// Writes an object member name; the member's value must follow.
    pub fn field_name(&mut self, name: &str) -> Result<(), MapperError> {
        if let Some(has_members) = self.stack.last_mut() {
            if *has_members {
                self.out.write_all(b",")?;
            }
            *has_members = true;
        }
        let quoted = serde_json::to_string(name).map_err(MapperError::from_json)?;
        self.out.write_all(quoted.as_bytes())?;
        self.out.write_all(b":")?;
        self.after_name = true;
        Ok(())
    }

    /// Writes any tree value in compact form.
    pub fn value(&mut self, value: &Value) -> Result<(), MapperError> {
        self.before_value()?;
        let rendered = serde_json::to_string(value).map_err(MapperError::from_json)?;
        self.out.write_all(rendered.as_bytes())?;
        Ok(())
    }

    pub fn string_value(&mut self, value: &str) -> Result<(), MapperError> {
        self.value(&Value::String(value.to_owned()))
    }

    pub fn i64_value(&mut self, value: i64) -> Result<(), MapperError> {
        self.value(&Value::from(value))
    }

    pub fn f64_value(&mut self, value: f64) -> Result<(), MapperError> {
        self.value(&Value::from(value))
    }

    pub fn bool_value(&mut self, value: bool) -> Result<(), MapperError> {
        self.value(&Value::Bool(value))
    }

    pub fn null_value(&mut self) -> Result<(), MapperError> {
        self.value(&Value::Null)
    }

    /// Convenience for a `name: value` member pair.
    pub fn field(&mut self, name: &str, value: &Value) -> Result<(), MapperError> {
        self.field_name(name)?;
        self.value(value)
    }

    pub fn flush(&mut self) -> Result<(), MapperError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn before_value(&mut self) -> Result<(), MapperError> {
        if self.after_name {
            self.after_name = false;
            return Ok(());
        }
        if let Some(has_members) = self.stack.last_mut() {
            if *has_members {
                self.out.write_all(b",")?;
            }
            *has_members = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn writes_nested_structures_with_separators() {
        let mut out = Vec::new();
        let mut writer = JsonStreamWriter::new(&mut out);

        writer.start_object().unwrap();
        writer.field_name("name").unwrap();
        writer.string_value("Narayana").unwrap();
        writer.field_name("age").unwrap();
        writer.i64_value(30).unwrap();
        writer.field_name("hobbies").unwrap();
        writer.start_array().unwrap();
        writer.string_value("coding").unwrap();
        writer.string_value("travel").unwrap();
        writer.end_array().unwrap();
        writer.field("meta", &json!({"deep": true})).unwrap();
        writer.end_object().unwrap();
        writer.flush().unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"{"name":"Narayana","age":30,"hobbies":["coding","travel"],"meta":{"deep":true}}"#
        );
    }

    #[test]
    fn names_are_escaped() {
        let mut out = Vec::new();
        let mut writer = JsonStreamWriter::new(&mut out);
        writer.start_object().unwrap();
        writer.field_name("a\"b").unwrap();
        writer.null_value().unwrap();
        writer.end_object().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"{"a\"b":null}"#);
    }

    #[test]
    fn top_level_values_carry_no_separator() {
        let mut out = Vec::new();
        let mut writer = JsonStreamWriter::new(&mut out);
        writer.i64_value(1).unwrap();
        assert_eq!(out, b"1");
    }
}
