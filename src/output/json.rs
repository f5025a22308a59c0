//! JSON persistence of crawl records

use crate::crawler::Record;
use crate::output::traits::{OutputError, OutputResult};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Writes a JSON document, pretty-printed, creating parent directories
pub fn write_json_document(document: &Value, path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut content = serde_json::to_string_pretty(document)?;
    content.push('\n');
    fs::write(path, content).map_err(|e| {
        OutputError::Write(format!("{}: {}", path.display(), e))
    })?;

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Reads any JSON document
pub fn read_json_document(path: &Path) -> OutputResult<Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| OutputError::Read(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&content)?)
}

/// Reads a previously written output file back into records
pub fn read_records(path: &Path) -> OutputResult<Vec<Record>> {
    let document = read_json_document(path)?;
    Ok(serde_json::from_value(document)?)
}
