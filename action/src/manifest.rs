//! Entry point validation and project alias lookup

use std::fs;
use std::path::Path;

use crate::errors::ActionError;

/// Check that the entry point directory holds a deployment manifest.
pub fn ensure_entry_point(dir: &Path) -> Result<(), ActionError> {
    let manifest = dir.join("firebase.json");
    if !manifest.is_file() {
        return Err(ActionError::ConfigError(format!(
            "no firebase.json found in entry point directory {}",
            dir.display()
        )));
    }
    Ok(())
}

/// Best-effort `.firebaserc` lookup of `projects.<alias>`.
pub fn project_id_from_alias(dir: &Path, alias: &str) -> Option<String> {
    let raw = fs::read_to_string(dir.join(".firebaserc")).ok()?;
    let firebaserc: serde_json::Value = serde_json::from_str(&raw).ok()?;
    firebaserc
        .get("projects")?
        .get(alias)?
        .as_str()
        .map(|id| id.to_string())
}
