//! Table and summary persistence.
//!
//! Each stage writes its table once, replacing any earlier file, and the
//! next stage reads it back with the same serde types.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

/// Writes `records` as a CSV table with a header row, replacing `path`.
pub fn write_records<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = records.len(), "Table written");
    Ok(())
}

/// Reads every row of a CSV table written by [`write_records`].
pub fn read_records<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize().enumerate() {
        let record: T =
            result.with_context(|| format!("invalid row {} in {}", i + 1, path.display()))?;
        rows.push(record);
    }

    debug!(path = %path.display(), rows = rows.len(), "Table loaded");
    Ok(rows)
}

/// Writes a value as pretty-printed JSON, replacing `path`.
pub fn write_json(path: impl AsRef<Path>, value: &impl Serialize) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), "JSON written");
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}
