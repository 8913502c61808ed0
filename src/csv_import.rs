//! Bulk body import - turns CSV (or a JSON array) into request bodies

use anyhow::{Context, Result};
use std::path::Path;

use crate::json_value::{JsonObject, JsonValue};

const DELIMITER: char = ',';

/// Parse CSV text into one body per data row.
///
/// The first line names the fields. A row is kept only when it has exactly
/// as many fields as the header; other rows are dropped without error.
/// Fields are trimmed and always become strings. Blank lines are skipped.
pub fn parse_bulk_csv(text: &str) -> Vec<JsonObject> {
    let mut lines = text.lines();

    let header: Vec<&str> = match lines.next() {
        Some(line) => line.split(DELIMITER).map(str::trim).collect(),
        None => return Vec::new(),
    };

    lines
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(i, line)| {
            let fields: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
            if fields.len() != header.len() {
                tracing::debug!(row = i + 2, expected = header.len(), found = fields.len(), "Dropping CSV row");
                return None;
            }
            Some(
                header
                    .iter()
                    .zip(fields)
                    .map(|(key, value)| (key.to_string(), JsonValue::from(value)))
                    .collect::<JsonObject>(),
            )
        })
        .collect()
}

/// Read and parse a `.csv` file
pub fn read_bulk_csv(path: &Path) -> Result<Vec<JsonObject>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(parse_bulk_csv(&text))
}

/// Bodies pasted as a JSON array of objects. Anything else yields nothing.
pub fn parse_bulk_json(text: &str) -> Vec<JsonObject> {
    serde_json::from_str(text).unwrap_or_default()
}
