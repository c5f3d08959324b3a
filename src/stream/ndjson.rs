use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::error::MapperError;
use crate::tree::{self, ValueExt};

use super::reader::JsonStreamReader;
use super::writer::JsonStreamWriter;
use super::Token;

/// Reads newline-delimited JSON: one independent document per line,
/// blank lines skipped. Parser state resets between lines, so memory is
/// bounded by the largest single line.
pub struct NdjsonReader<R: BufRead> {
    input: R,
    line: String,
}

impl<R: BufRead> NdjsonReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: String::new(),
        }
    }

    /// The next document, or `Ok(None)` at end of stream.
    pub fn next_value(&mut self) -> Result<Option<Value>, MapperError> {
        loop {
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            return tree::parse(line).map(Some);
        }
    }
}

/// Writes newline-delimited JSON, one compact document per line.
pub struct NdjsonWriter<W: Write> {
    out: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_value(&mut self, value: &Value) -> Result<(), MapperError> {
        let rendered = serde_json::to_string(value).map_err(MapperError::from_json)?;
        self.out.write_all(rendered.as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    /// Writes any serializable record as one line.
    pub fn write_record<T: Serialize>(&mut self, record: &T) -> Result<(), MapperError> {
        let rendered = serde_json::to_string(record).map_err(MapperError::from_json)?;
        self.out.write_all(rendered.as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), MapperError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Outcome of [`filter_lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub processed: u64,
    pub written: u64,
}

const LEVELS: [&str; 4] = ["INFO", "WARN", "ERROR", "DEBUG"];

/// Synthesizes an NDJSON log file of `lines` records, buffering one line
/// at a time. Returns the number of lines written.
pub fn generate_log_file(path: &Path, lines: u64) -> Result<u64, MapperError> {
    let timestamp_format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let mut out = BufWriter::new(File::create(path)?);
    let mut line = Vec::with_capacity(256);

    for counter in 0..lines {
        let timestamp = OffsetDateTime::now_utc()
            .format(timestamp_format)
            .map_err(std::io::Error::other)?;

        line.clear();
        {
            let mut writer = JsonStreamWriter::new(&mut line);
            writer.start_object()?;
            writer.field_name("timestamp")?;
            writer.string_value(&timestamp)?;
            writer.field_name("level")?;
            writer.string_value(LEVELS[(counter % LEVELS.len() as u64) as usize])?;
            writer.field_name("message")?;
            writer.string_value(&format!("Sample log message {counter}"))?;
            writer.field_name("event_id")?;
            writer.i64_value(counter as i64)?;
            writer.field_name("metadata")?;
            writer.start_object()?;
            writer.field_name("thread")?;
            writer.string_value(&format!("worker-{}", counter % 16))?;
            writer.field_name("source")?;
            writer.string_value("log-generator")?;
            writer.end_object()?;
            writer.end_object()?;
        }
        line.push(b'\n');
        out.write_all(&line)?;

        if (counter + 1) % 50_000 == 0 {
            debug!("generated {} lines so far", counter + 1);
            out.flush()?;
        }
    }

    out.flush()?;
    Ok(lines)
}

/// Copies the lines whose `field` equals `expected` into `output`,
/// byte-identical to their source lines. Blank lines are skipped.
pub fn filter_lines(
    input: &Path,
    output: &Path,
    field: &str,
    expected: &str,
) -> Result<FilterSummary, MapperError> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut out = BufWriter::new(File::create(output)?);

    let mut summary = FilterSummary {
        processed: 0,
        written: 0,
    };
    let mut raw = String::new();

    loop {
        raw.clear();
        if reader.read_line(&mut raw)? == 0 {
            break;
        }
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }

        let value = tree::parse(line)?;
        if value.node().path(field).as_text("") == expected {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
            summary.written += 1;
        }
        summary.processed += 1;
    }

    out.flush()?;
    debug!(
        "filter complete: {} processed, {} written",
        summary.processed, summary.written
    );
    Ok(summary)
}

/// Counts occurrences of each value of `field` across an NDJSON file.
/// Only the fixed-cardinality counter table is held in memory.
pub fn count_field_values(input: &Path, field: &str) -> Result<HashMap<String, u64>, MapperError> {
    let mut reader = NdjsonReader::new(BufReader::new(File::open(input)?));
    let mut counters: HashMap<String, u64> = HashMap::new();

    while let Some(value) = reader.next_value()? {
        let key = value.node().path(field).as_text("unknown");
        *counters.entry(key).or_insert(0) += 1;
    }

    Ok(counters)
}

/// Converts an NDJSON file into a single JSON array, transplanting each
/// line's root object token-by-token. Memory is bounded by one line.
pub fn ndjson_to_array(input: &Path, output: &Path) -> Result<u64, MapperError> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut writer = JsonStreamWriter::new(BufWriter::new(File::create(output)?));

    writer.start_array()?;

    let mut count = 0u64;
    let mut raw = String::new();
    loop {
        raw.clear();
        if reader.read_line(&mut raw)? == 0 {
            break;
        }
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let mut document = JsonStreamReader::new(line.as_bytes());
        if let Some(Token::StartObject) = document.next_token()? {
            document.copy_subtree(&mut writer)?;
            count += 1;
        }
    }

    writer.end_array()?;
    writer.flush()?;
    Ok(count)
}
