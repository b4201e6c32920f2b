//! Normalizer: tabular text and JSON envelopes into ordered rows.
//!
//! Also hosts the total coercions every other module relies on:
//! - [`num`] turns any text into a finite `f64` (unparsable → `0`)
//! - [`parse_timestamp`] turns text into an instant, `None` ordering first
//! - [`time_of_day`] extracts `HH:MM:SS` for display

use crate::domain::Row;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value;
use thiserror::Error;

/// Errors decoding a `{ "rows": [...] }` response body.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response has no `rows` array")]
    MissingRows,

    #[error("row {index} is not a JSON object")]
    RowNotObject { index: usize },
}

/// Parse comma-separated text with a mandatory header row.
pub fn parse_csv(text: &str) -> Vec<Row> {
    parse_delimited(text, b',')
}

/// Parse delimited text with a mandatory header row.
///
/// Quoted fields may contain the delimiter, and `""` inside a quoted field is
/// a literal quote. Headers and values are trimmed. Rows shorter than the
/// header are padded with `""`; extra cells are dropped. Fewer than two lines
/// yields an empty result.
pub fn parse_delimited(text: &str, delimiter: u8) -> Vec<Row> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text).trim();
    if text.lines().nth(1).is_none() {
        return Vec::new();
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(err) => {
            tracing::warn!(%err, "unreadable header row, treating source as empty");
            return Vec::new();
        }
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => {
                let row: Row = headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h, record.get(i).unwrap_or("")))
                    .collect();
                rows.push(row);
            }
            Err(err) => tracing::warn!(%err, "skipping malformed row"),
        }
    }
    rows
}

/// Decode a `{ "rows": [ {field: value, ...}, ... ] }` body into rows.
///
/// Scalars are stringified: strings as-is, numbers and booleans by their JSON
/// text, `null` as `""`. Values are trimmed like delimited cells.
pub fn parse_rows_envelope(body: &str) -> Result<Vec<Row>, EnvelopeError> {
    let value: Value = serde_json::from_str(body)?;
    let rows = match value.get("rows") {
        Some(Value::Array(rows)) => rows,
        _ => return Err(EnvelopeError::MissingRows),
    };

    rows.iter()
        .enumerate()
        .map(|(index, row)| match row {
            Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.as_str(), json_cell(v)))
                .collect::<Row>()),
            _ => Err(EnvelopeError::RowNotObject { index }),
        })
        .collect()
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Coerce text to a number. Never fails.
///
/// Thousands separators and whitespace are stripped; anything unparsable or
/// non-finite becomes `0`.
pub fn num(value: &str) -> f64 {
    let cleaned: String = value
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// String encoding for derived numbers: shortest round-trip form, `15` not `15.0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }
    value.to_string()
}

/// Parse an ISO-like timestamp.
///
/// Accepts RFC 3339 with an offset or `Z`, naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// (either `T` or a space), and bare `YYYY-MM-DD`. Naive forms are read as
/// UTC. `None` compares before every parsed instant, which is what makes
/// time ordering total.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Extract `HH:MM:SS` following a `T`; otherwise return the input unchanged.
pub fn time_of_day(value: &str) -> &str {
    let bytes = value.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'T' || i + 9 > bytes.len() {
            continue;
        }
        let candidate = &bytes[i + 1..i + 9];
        if is_hms(candidate) {
            return &value[i + 1..i + 9];
        }
    }
    value
}

fn is_hms(b: &[u8]) -> bool {
    b.len() == 8
        && b[2] == b':'
        && b[5] == b':'
        && [0, 1, 3, 4, 6, 7].iter().all(|&i| b[i].is_ascii_digit())
}
