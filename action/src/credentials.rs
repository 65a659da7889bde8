//! Service account credential materialization

use std::io::Write;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::ActionError;

/// Filesystem handle for the Google application credentials consumed by
/// the Firebase CLI.
///
/// When the input is raw service account JSON it is written to a temp file
/// whose lifetime is tied to this handle; the contents are never validated.
#[derive(Debug)]
pub struct GacFile {
    path: PathBuf,
    _temp: Option<NamedTempFile>,
}

impl GacFile {
    pub fn materialize(material: &SecretString) -> Result<Self, ActionError> {
        let raw = material.expose_secret();
        if raw.trim().is_empty() {
            return Err(ActionError::ConfigError(
                "firebaseServiceAccount input is empty".to_string(),
            ));
        }

        // An existing path is used as-is so workflows can point at a file
        // they materialized themselves.
        let candidate = Path::new(raw.trim());
        if !raw.contains('{') && candidate.is_file() {
            debug!("Using existing credentials file {}", candidate.display());
            return Ok(Self {
                path: candidate.to_path_buf(),
                _temp: None,
            });
        }

        let mut temp = tempfile::Builder::new()
            .prefix("gac-")
            .suffix(".json")
            .tempfile()?;
        temp.write_all(raw.as_bytes())?;
        temp.flush()?;

        let path = temp.path().to_path_buf();
        debug!("Wrote credentials to {}", path.display());
        Ok(Self {
            path,
            _temp: Some(temp),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
