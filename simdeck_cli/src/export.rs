//! History export for offline plotting.
//!
//! Writes the fetched history as `{"history": [...]}` so external plotting
//! tooling can consume a run without talking to the server.

use simdeck::history::StepRecord;
use std::fs;
use std::path::PathBuf;

/// Default export location under the OS data directory.
fn default_export_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("simdeck")
        .join("history.json")
}

pub fn write_history(records: &[StepRecord], path: Option<PathBuf>) -> Result<PathBuf, String> {
    let path = path.unwrap_or_else(default_export_file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("could not create {}: {e}", parent.display()))?;
    }
    let doc = serde_json::json!({ "history": records });
    let data = serde_json::to_vec_pretty(&doc).map_err(|e| format!("encode failed: {e}"))?;
    fs::write(&path, data).map_err(|e| format!("could not write {}: {e}", path.display()))?;
    Ok(path)
}
