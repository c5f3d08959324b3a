//! Constant-memory NDJSON pipeline: generate a synthetic log file, count
//! level frequencies, filter one level into a new file and convert the
//! result into a single JSON array, all without holding more than one
//! line in memory.
//!
//! Run with `cargo run --example log_pipeline`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Result;
use log::info;

use json_mapper_rs::stream::ndjson::{
    count_field_values, filter_lines, generate_log_file, ndjson_to_array,
};
use json_mapper_rs::{JsonStreamReader, Token};

/// Token-level selective extraction: pulls the first `limit` ERROR
/// event ids out of the file, skipping every other subtree unparsed.
fn first_error_ids(path: &Path, limit: usize) -> Result<Vec<i64>> {
    let mut reader = JsonStreamReader::new(BufReader::new(File::open(path)?));
    let mut ids = Vec::new();
    while ids.len() < limit {
        let Some(token) = reader.next_token()? else {
            break;
        };
        if token != Token::StartObject || reader.depth() != 1 {
            continue;
        }
        let mut event_id = None;
        let mut is_error = false;
        loop {
            match reader.next_token()? {
                Some(Token::FieldName(name)) => match name.as_str() {
                    "event_id" => {
                        if let Some(Token::Scalar(value)) = reader.next_token()? {
                            event_id = value.as_i64();
                        }
                    }
                    "level" => {
                        if let Some(Token::Scalar(value)) = reader.next_token()? {
                            is_error = value.as_str() == Some("ERROR");
                        }
                    }
                    _ => reader.skip_value()?,
                },
                Some(Token::EndObject) | None => break,
                Some(_) => {}
            }
        }
        if is_error {
            if let Some(id) = event_id {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = tempfile::tempdir()?;
    let raw = dir.path().join("app-logs.ndjson");
    let errors = dir.path().join("errors.ndjson");
    let array = dir.path().join("errors.json");

    let lines = generate_log_file(&raw, 100_000)?;
    info!("generated {lines} log lines at {}", raw.display());

    let counts = count_field_values(&raw, "level")?;
    println!("level frequencies: {counts:?}");

    let ids = first_error_ids(&raw, 5)?;
    println!("first ERROR event ids: {ids:?}");

    let summary = filter_lines(&raw, &errors, "level", "ERROR")?;
    println!(
        "filtered {} of {} lines into {}",
        summary.written,
        summary.processed,
        errors.display()
    );

    let converted = ndjson_to_array(&errors, &array)?;
    println!("wrapped {converted} documents into {}", array.display());

    Ok(())
}
