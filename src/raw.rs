//! Raw Scorecard table: one flat key/value record per institution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::fields;

/// A single raw institution row keyed by Scorecard field name.
///
/// Cells are kept as text; empty cells and `NULL`/`NaN` markers read as
/// missing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    values: HashMap<String, String>,
}

impl RawRecord {
    pub fn from_pairs<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(parse_number)
    }

    pub fn code(&self, key: &str) -> Option<i64> {
        self.number(key).and_then(as_code)
    }

    pub fn id(&self) -> Option<u64> {
        self.code(fields::ID).and_then(|id| u64::try_from(id).ok())
    }

    /// Projects this record through a rename table (`source key -> column name`).
    pub fn renamed<'a>(&'a self, renames: &[(&str, &'static str)]) -> RenamedRow<'a> {
        let values = renames
            .iter()
            .filter_map(|(source, target)| Some((*target, self.get(source)?)))
            .collect();
        RenamedRow { values }
    }
}

/// A raw record viewed under its cleaned column names.
#[derive(Debug)]
pub struct RenamedRow<'a> {
    values: HashMap<&'static str, &'a str>,
}

impl RenamedRow<'_> {
    pub fn text(&self, column: &str) -> Option<String> {
        self.values
            .get(column)
            .and_then(|v| parse_text(v))
            .map(str::to_string)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.values.get(column).and_then(|v| parse_number(v))
    }

    pub fn code(&self, column: &str) -> Option<i64> {
        self.number(column).and_then(as_code)
    }
}

fn parse_text(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    match trimmed {
        "" | "NULL" | "null" | "NaN" | "nan" => None,
        _ => Some(trimmed),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    parse_text(raw)?.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn as_code(value: f64) -> Option<i64> {
    (value.fract() == 0.0).then_some(value as i64)
}

/// Reads every row of a raw table CSV.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_raw_table(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open raw table {}", path.display()))?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: RawRecord = result?;
        rows.push(record);
    }

    debug!(rows = rows.len(), "Raw table loaded");
    Ok(rows)
}

/// Writes rows of `(column -> cell)` maps under an explicit header order.
/// Columns absent from a row are written as empty cells.
pub fn write_raw_table(
    path: impl AsRef<Path>,
    headers: &[String],
    rows: &[HashMap<String, String>],
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create raw table {}", path.display()))?;

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(
            headers
                .iter()
                .map(|h| row.get(h).map(String::as_str).unwrap_or("")),
        )?;
    }
    writer.flush()?;

    Ok(())
}
