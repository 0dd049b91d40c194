//! I/O utilities for configuration-style files.

use serde::{Serialize, de::DeserializeOwned};

use crate::prelude::*;

/// Is this path a JSON file, judging by its extension?
fn is_json_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Read TOML or JSON from a file. Anything without a `.json` extension is
/// parsed as TOML.
pub async fn read_json_or_toml<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at path: {:?}", path))?;
    if is_json_path(path) {
        serde_json::from_str(&data).with_context(|| {
            format!("Failed to parse JSON from file at path: {:?}", path)
        })
    } else {
        toml::from_str(&data).with_context(|| {
            format!("Failed to parse TOML from file at path: {:?}", path)
        })
    }
}

/// Write a value to a file as pretty-printed JSON.
pub async fn write_json<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    let mut json = serde_json::to_string_pretty(value)
        .context("Failed to serialize JSON output")?;
    json.push('\n');
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write file at path: {:?}", path))
}
