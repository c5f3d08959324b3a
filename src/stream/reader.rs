use std::io::{BufRead, BufReader, Read, Write};

use serde_json::Value;

use crate::error::MapperError;

use super::writer::JsonStreamWriter;
use super::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// What the grammar allows next inside the innermost open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// Object: first member name or `}`.
    NameOrEnd,
    /// Object: member name after a comma.
    Name,
    /// Object: `:` after a member name.
    Colon,
    /// Object: the member's value.
    MemberValue,
    /// Array: first element or `]`.
    ElementOrEnd,
    /// Array: element after a comma.
    Element,
    /// A member/element is complete: `,` or the matching close.
    CommaOrEnd,
}

#[derive(Debug)]
struct Frame {
    kind: Container,
    expect: Expect,
}

/// Forward-only token reader over an open byte stream.
///
/// Lookahead is a single byte; scalar tokens are buffered whole, so
/// memory is bounded by the longest scalar in the document, never by the
/// document size. Consecutive whitespace-separated top-level values are
/// accepted, which lets one reader walk an entire NDJSON stream.
///
/// The cursor cannot rewind. Dropping the reader releases the underlying
/// stream; closing that stream out from under the reader makes the next
/// read fail fast with an I/O error.
pub struct JsonStreamReader<R: Read> {
    input: BufReader<R>,
    peeked: Option<u8>,
    stack: Vec<Frame>,
    current: Option<Token>,
    offset: u64,
    line: usize,
    column: usize,
}

impl<R: Read> JsonStreamReader<R> {
    pub fn new(input: R) -> Self {
        Self::with_capacity(8 * 1024, input)
    }

    pub fn with_capacity(capacity: usize, input: R) -> Self {
        Self {
            input: BufReader::with_capacity(capacity, input),
            peeked: None,
            stack: Vec::new(),
            current: None,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Nesting depth of the cursor (0 between top-level values).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Bytes consumed so far.
    pub fn byte_offset(&self) -> u64 {
        self.offset
    }

    /// Capacity of the underlying read buffer, fixed at construction.
    pub fn buffer_capacity(&self) -> usize {
        self.input.capacity()
    }

    /// Advances one token. `Ok(None)` is a clean end of stream; end of
    /// stream inside an open container is a parse error, as is any
    /// misplaced, repeated or missing `,`/`:` separator.
    pub fn next_token(&mut self) -> Result<Option<Token>, MapperError> {
        loop {
            self.skip_whitespace()?;
            match self.peek()? {
                Some(b',') => {
                    self.on_comma()?;
                    self.bump()?;
                }
                Some(b':') => {
                    self.on_colon()?;
                    self.bump()?;
                }
                _ => break,
            }
        }

        let Some(byte) = self.peek()? else {
            if self.stack.is_empty() {
                self.current = None;
                return Ok(None);
            }
            return Err(self.error("unexpected end of stream inside a container"));
        };

        let token = match byte {
            b'{' => {
                self.value_begins()?;
                self.bump()?;
                self.stack.push(Frame {
                    kind: Container::Object,
                    expect: Expect::NameOrEnd,
                });
                Token::StartObject
            }
            b'[' => {
                self.value_begins()?;
                self.bump()?;
                self.stack.push(Frame {
                    kind: Container::Array,
                    expect: Expect::ElementOrEnd,
                });
                Token::StartArray
            }
            b'}' => {
                self.close(Container::Object)?;
                Token::EndObject
            }
            b']' => {
                self.close(Container::Array)?;
                Token::EndArray
            }
            b'"' => {
                if self.expecting_name() {
                    let text = self.read_string()?;
                    if let Some(frame) = self.stack.last_mut() {
                        frame.expect = Expect::Colon;
                    }
                    Token::FieldName(text)
                } else {
                    self.value_begins()?;
                    Token::Scalar(Value::String(self.read_string()?))
                }
            }
            b't' | b'f' | b'n' => {
                self.value_begins()?;
                self.read_keyword()?
            }
            b'-' | b'0'..=b'9' => {
                self.value_begins()?;
                self.read_number()?
            }
            other => {
                return Err(self.error(&format!("unexpected character '{}'", other as char)));
            }
        };

        self.current = Some(token.clone());
        Ok(Some(token))
    }

    /// Consumes everything up to the close of the container the cursor
    /// just entered, without materializing any of it. A no-op when the
    /// current token is not a container start.
    pub fn skip_subtree(&mut self) -> Result<(), MapperError> {
        let mut depth = match self.current {
            Some(Token::StartObject) | Some(Token::StartArray) => 1usize,
            _ => return Ok(()),
        };
        while depth > 0 {
            match self.next_token()? {
                Some(Token::StartObject) | Some(Token::StartArray) => depth += 1,
                Some(Token::EndObject) | Some(Token::EndArray) => depth -= 1,
                Some(_) => {}
                None => return Err(self.error("unexpected end of stream while skipping")),
            }
        }
        Ok(())
    }

    /// Consumes the next complete value, scalar or subtree.
    pub fn skip_value(&mut self) -> Result<(), MapperError> {
        self.next_token()?;
        self.skip_subtree()
    }

    /// Re-emits the current token and, if it opens a container, every
    /// token up to the matching close. Memory stays bounded by one token
    /// regardless of the subtree size.
    pub fn copy_subtree<W: Write>(
        &mut self,
        writer: &mut JsonStreamWriter<W>,
    ) -> Result<(), MapperError> {
        let Some(current) = self.current.clone() else {
            return Ok(());
        };
        emit(&current, writer)?;

        let mut depth = match current {
            Token::StartObject | Token::StartArray => 1usize,
            _ => return Ok(()),
        };
        while depth > 0 {
            match self.next_token()? {
                Some(token) => {
                    match token {
                        Token::StartObject | Token::StartArray => depth += 1,
                        Token::EndObject | Token::EndArray => depth -= 1,
                        _ => {}
                    }
                    emit(&token, writer)?;
                }
                None => return Err(self.error("unexpected end of stream while copying")),
            }
        }
        Ok(())
    }

    fn expecting_name(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Frame {
                kind: Container::Object,
                expect: Expect::NameOrEnd | Expect::Name,
            })
        )
    }

    /// Validates that a value may begin here and marks the enclosing
    /// member/element as complete.
    fn value_begins(&mut self) -> Result<(), MapperError> {
        let message = match self.stack.last_mut() {
            None => None,
            Some(frame) => match frame.expect {
                Expect::MemberValue | Expect::ElementOrEnd | Expect::Element => {
                    frame.expect = Expect::CommaOrEnd;
                    None
                }
                Expect::NameOrEnd | Expect::Name => Some("member name expected"),
                Expect::Colon => Some("':' expected after member name"),
                Expect::CommaOrEnd => Some("',' expected between values"),
            },
        };
        match message {
            None => Ok(()),
            Some(message) => Err(self.error(message)),
        }
    }

    fn close(&mut self, kind: Container) -> Result<(), MapperError> {
        let message = match self.stack.last() {
            Some(frame) if frame.kind == kind => match frame.expect {
                Expect::NameOrEnd | Expect::ElementOrEnd | Expect::CommaOrEnd => None,
                Expect::Colon => Some("':' expected after member name"),
                Expect::MemberValue => Some("member value expected"),
                Expect::Name | Expect::Element => Some("trailing comma before close"),
            },
            _ => Some(match kind {
                Container::Object => "unmatched '}'",
                Container::Array => "unmatched ']'",
            }),
        };
        if let Some(message) = message {
            return Err(self.error(message));
        }
        self.bump()?;
        self.stack.pop();
        Ok(())
    }

    fn on_comma(&mut self) -> Result<(), MapperError> {
        let accepted = match self.stack.last_mut() {
            Some(frame) if frame.expect == Expect::CommaOrEnd => {
                frame.expect = match frame.kind {
                    Container::Object => Expect::Name,
                    Container::Array => Expect::Element,
                };
                true
            }
            _ => false,
        };
        if accepted {
            Ok(())
        } else {
            Err(self.error("unexpected ','"))
        }
    }

    fn on_colon(&mut self) -> Result<(), MapperError> {
        let accepted = match self.stack.last_mut() {
            Some(frame) if frame.expect == Expect::Colon => {
                frame.expect = Expect::MemberValue;
                true
            }
            _ => false,
        };
        if accepted {
            Ok(())
        } else {
            Err(self.error("unexpected ':'"))
        }
    }

    fn skip_whitespace(&mut self) -> Result<(), MapperError> {
        while let Some(byte) = self.peek()? {
            match byte {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump()?;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn read_string(&mut self) -> Result<String, MapperError> {
        // Collect the raw lexeme, quotes included, and let serde_json
        // handle escapes and UTF-8 validation.
        let mut lexeme = Vec::with_capacity(16);
        lexeme.push(self.bump()?.ok_or_else(|| self.eof_error())?);
        loop {
            match self.bump()? {
                None => return Err(self.error("unterminated string")),
                Some(b'\\') => {
                    lexeme.push(b'\\');
                    match self.bump()? {
                        None => return Err(self.error("unterminated string escape")),
                        Some(escaped) => lexeme.push(escaped),
                    }
                }
                Some(b'"') => {
                    lexeme.push(b'"');
                    break;
                }
                Some(byte) => lexeme.push(byte),
            }
        }
        serde_json::from_slice(&lexeme).map_err(MapperError::from_json)
    }

    fn read_keyword(&mut self) -> Result<Token, MapperError> {
        let mut lexeme = Vec::with_capacity(5);
        while let Some(byte) = self.peek()? {
            if byte.is_ascii_lowercase() {
                lexeme.push(byte);
                self.bump()?;
            } else {
                break;
            }
        }
        match lexeme.as_slice() {
            b"true" => Ok(Token::Scalar(Value::Bool(true))),
            b"false" => Ok(Token::Scalar(Value::Bool(false))),
            b"null" => Ok(Token::Scalar(Value::Null)),
            other => Err(self.error(&format!(
                "invalid literal '{}'",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn read_number(&mut self) -> Result<Token, MapperError> {
        let mut lexeme = Vec::with_capacity(16);
        while let Some(byte) = self.peek()? {
            match byte {
                b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E' => {
                    lexeme.push(byte);
                    self.bump()?;
                }
                _ => break,
            }
        }
        let number: serde_json::Number =
            serde_json::from_slice(&lexeme).map_err(MapperError::from_json)?;
        Ok(Token::Scalar(Value::Number(number)))
    }

    fn peek(&mut self) -> Result<Option<u8>, MapperError> {
        if self.peeked.is_none() {
            let buffer = self.input.fill_buf()?;
            if let Some(&byte) = buffer.first() {
                self.input.consume(1);
                self.peeked = Some(byte);
            }
        }
        Ok(self.peeked)
    }

    fn bump(&mut self) -> Result<Option<u8>, MapperError> {
        let byte = self.peek()?;
        if let Some(byte) = byte {
            self.peeked = None;
            self.offset += 1;
            if byte == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        Ok(byte)
    }

    fn error(&self, message: &str) -> MapperError {
        MapperError::Parse {
            line: self.line,
            column: self.column,
            message: message.to_owned(),
        }
    }

    fn eof_error(&self) -> MapperError {
        self.error("unexpected end of stream")
    }
}

fn emit<W: Write>(token: &Token, writer: &mut JsonStreamWriter<W>) -> Result<(), MapperError> {
    match token {
        Token::StartObject => writer.start_object(),
        Token::EndObject => writer.end_object(),
        Token::StartArray => writer.start_array(),
        Token::EndArray => writer.end_array(),
        Token::FieldName(name) => writer.field_name(name),
        Token::Scalar(value) => writer.value(value),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SAMPLE: &str = r#"{
      "name": "Narayana",
      "age": 30,
      "address": { "city": "Bangalore", "country": "India" },
      "hobbies": ["chess", "coding"]
    }"#;

    fn drain(text: &str) -> Result<Vec<Token>, MapperError> {
        let mut reader = JsonStreamReader::new(text.as_bytes());
        let mut tokens = Vec::new();
        while let Some(token) = reader.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn tokens(text: &str) -> Vec<Token> {
        drain(text).unwrap()
    }

    #[test]
    fn walks_a_document_token_by_token() {
        let tokens = tokens(r#"{"a": [1, true, null], "b": "x"}"#);
        assert_eq!(
            tokens,
            vec![
                Token::StartObject,
                Token::FieldName("a".into()),
                Token::StartArray,
                Token::Scalar(json!(1)),
                Token::Scalar(json!(true)),
                Token::Scalar(Value::Null),
                Token::EndArray,
                Token::FieldName("b".into()),
                Token::Scalar(json!("x")),
                Token::EndObject,
            ]
        );
    }

    #[test]
    fn strings_unescape_through_the_lexeme() {
        let tokens = tokens(r#"{"msg": "line\n\"quoted\" é"}"#);
        assert_eq!(
            tokens[2],
            Token::Scalar(json!("line\n\"quoted\" \u{e9}"))
        );
    }

    #[test]
    fn selective_extraction_with_subtree_skip() {
        let mut reader = JsonStreamReader::new(SAMPLE.as_bytes());
        let mut name = None;
        let mut age = None;

        assert_eq!(reader.next_token().unwrap(), Some(Token::StartObject));
        while let Some(token) = reader.next_token().unwrap() {
            match token {
                Token::FieldName(field) => match field.as_str() {
                    "name" => {
                        if let Some(Token::Scalar(Value::String(text))) =
                            reader.next_token().unwrap()
                        {
                            name = Some(text);
                        }
                    }
                    "age" => {
                        if let Some(Token::Scalar(value)) = reader.next_token().unwrap() {
                            age = value.as_i64();
                        }
                    }
                    _ => reader.skip_value().unwrap(),
                },
                Token::EndObject => break,
                other => panic!("unexpected token {other:?}"),
            }
        }

        assert_eq!(name.as_deref(), Some("Narayana"));
        assert_eq!(age, Some(30));
    }

    #[test]
    fn copy_subtree_transplants_structure_verbatim() {
        let mut reader = JsonStreamReader::new(SAMPLE.as_bytes());
        let mut out = Vec::new();
        let mut writer = JsonStreamWriter::new(&mut out);

        reader.next_token().unwrap();
        reader.copy_subtree(&mut writer).unwrap();
        writer.flush().unwrap();

        let copied: Value = serde_json::from_slice(&out).unwrap();
        let original: Value = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(copied, original);
    }

    #[test]
    fn consecutive_top_level_documents_are_accepted() {
        let mut reader = JsonStreamReader::new("{\"a\":1}\n{\"a\":2}\n".as_bytes());
        let mut objects = 0;
        while let Some(token) = reader.next_token().unwrap() {
            if token == Token::StartObject {
                objects += 1;
                reader.skip_subtree().unwrap();
            }
        }
        assert_eq!(objects, 2);
    }

    #[test]
    fn missing_separators_are_rejected() {
        assert!(drain(r#"{"a" 1 "b" 2}"#).is_err());
        assert!(drain("[1 2 3]").is_err());
        assert!(drain(r#"{"a":1 "b":2}"#).is_err());
        assert!(drain(r#"{"a" "b"}"#).is_err());
    }

    #[test]
    fn misplaced_punctuation_is_rejected() {
        assert!(drain(r#"{"a"::::1}"#).is_err());
        assert!(drain("[1,,2]").is_err());
        assert!(drain(",1").is_err());
        assert!(drain("{:1}").is_err());
        assert!(drain("[1:2]").is_err());
    }

    #[test]
    fn trailing_commas_are_rejected() {
        assert!(drain("[1,2,]").is_err());
        assert!(drain(r#"{"a":1,}"#).is_err());
    }

    #[test]
    fn empty_containers_are_accepted() {
        assert_eq!(
            drain("{} []").unwrap(),
            vec![
                Token::StartObject,
                Token::EndObject,
                Token::StartArray,
                Token::EndArray,
            ]
        );
    }

    #[test]
    fn truncated_input_is_a_parse_error() {
        let mut reader = JsonStreamReader::new(r#"{"a": [1, 2"#.as_bytes());
        let result = loop {
            match reader.next_token() {
                Ok(Some(_)) => continue,
                other => break other,
            }
        };
        assert!(matches!(result, Err(MapperError::Parse { .. })));
    }

    #[test]
    fn position_tracks_lines_and_offsets() {
        let mut reader = JsonStreamReader::new("{\n  \"a\": }".as_bytes());
        reader.next_token().unwrap();
        reader.next_token().unwrap();
        let error = reader.next_token().unwrap_err();
        match error {
            MapperError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(reader.byte_offset() > 0);
    }
}
