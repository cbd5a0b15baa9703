//! Flatten arbitrary JSON records into spreadsheet-friendly CSV text.
//!
//! Nested objects become dot-joined column paths and arrays are kept as their
//! JSON text. The header is the ordinal-sorted union of every row's paths,
//! so rows with missing fields get empty cells. Output starts with a UTF-8
//! byte order mark so spreadsheet tools pick the right encoding.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use tracing::error;

use crate::error::{Result, SellerError};

pub const BOM: &str = "\u{feff}";
/// Column used for rows that are not objects
const SCALAR_COLUMN: &str = "value";

pub type FlatRow = BTreeMap<String, String>;

/// Render rows as BOM-prefixed CSV with `\n` between lines and no trailing
/// newline. Never fails; an empty input yields just the BOM.
pub fn to_table(rows: &[Value]) -> String {
    let mut buf = Vec::new();
    if let Err(e) = write_table(rows, &mut buf) {
        error!(error = %e, "Failed to encode table");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Same output as [`to_table`], streamed into `out`.
pub fn write_table<W: Write>(rows: &[Value], mut out: W) -> Result<()> {
    let body = encode_rows(rows)?;
    out.write_all(BOM.as_bytes())?;
    out.write_all(&body)?;
    out.flush()?;
    Ok(())
}

fn encode_rows(rows: &[Value]) -> Result<Vec<u8>> {
    let flattened: Vec<FlatRow> = rows.iter().map(flatten_row).collect();
    let header: BTreeSet<&str> = flattened
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();
    if header.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = WriterBuilder::new();
    builder
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary);

    let mut lines = Vec::with_capacity(flattened.len() + 1);
    lines.push(encode_line(&builder, header.iter().copied().collect())?);
    for row in &flattened {
        let cells = header
            .iter()
            .map(|column| row.get(*column).map(String::as_str).unwrap_or(""))
            .collect();
        lines.push(encode_line(&builder, cells)?);
    }
    Ok(lines.join(&b'\n'))
}

/// One CSV line without its terminator. `csv` quotes a record made of a
/// single empty field as `""`; here that line stays empty.
fn encode_line(builder: &WriterBuilder, cells: Vec<&str>) -> Result<Vec<u8>> {
    if let [only] = cells.as_slice() {
        if only.is_empty() {
            return Ok(Vec::new());
        }
    }
    let mut writer = builder.from_writer(Vec::new());
    writer.write_record(&cells)?;
    let mut line = writer
        .into_inner()
        .map_err(|e| SellerError::Io(e.into_error()))?;
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    Ok(line)
}

/// Flatten one record into `path -> cell text`.
pub fn flatten_row(row: &Value) -> FlatRow {
    let mut flat = FlatRow::new();
    match row {
        Value::Object(map) => flatten_into(&mut flat, map, None),
        other => {
            flat.insert(SCALAR_COLUMN.to_string(), cell_text(other));
        }
    }
    flat
}

fn flatten_into(flat: &mut FlatRow, map: &Map<String, Value>, prefix: Option<&str>) {
    for (key, value) in map {
        let path = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(flat, nested, Some(&path)),
            _ => {
                flat.insert(path, cell_text(value));
            }
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Arrays (and objects reaching here as bare rows) keep their JSON text
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
