use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::{Number, Value};
use tracing::warn;

use crate::enrich::{LEG_COLUMNS, Row};

/// Columns that hold leg text and must never be coerced to numbers.
const TEXT_COLUMNS: [&str; 3] = ["legs", "slip_key", "legs_detail"];

pub fn read_csv_rows<R: Read>(rdr: R) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let headers = reader.headers().context("read csv header")?.clone();
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!("skipping malformed slip row {}: {err}", idx + 1);
                continue;
            }
        };
        let mut row = Row::new();
        for (name, cell) in headers.iter().zip(record.iter()) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = if is_text_column(name) {
                text_cell(cell)
            } else {
                coerce_cell(cell)
            };
            row.insert(name.to_string(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Accepts a bare array of objects, or an object wrapping one under `slips`
/// or `rows`.
pub fn parse_json_rows(raw: &str) -> Result<Vec<Row>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let v: Value = serde_json::from_str(trimmed).context("invalid slips json")?;
    let items = match &v {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("slips")
            .or_else(|| obj.get("rows"))
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("slips json object has no slips/rows array"))?,
        _ => return Err(anyhow!("slips json must be an array or object")),
    };
    Ok(items
        .iter()
        .filter_map(|item| item.as_object().cloned())
        .collect())
}

pub fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let raw =
            fs::read_to_string(path).with_context(|| format!("read slips {}", path.display()))?;
        parse_json_rows(&raw).with_context(|| format!("parse slips {}", path.display()))
    } else {
        let file =
            fs::File::open(path).with_context(|| format!("open slips {}", path.display()))?;
        read_csv_rows(file).with_context(|| format!("parse slips {}", path.display()))
    }
}

fn is_text_column(name: &str) -> bool {
    LEG_COLUMNS.contains(&name) || TEXT_COLUMNS.contains(&name)
}

fn text_cell(cell: &str) -> Value {
    if cell.trim().is_empty() {
        Value::Null
    } else {
        Value::String(cell.to_string())
    }
}

fn coerce_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}
