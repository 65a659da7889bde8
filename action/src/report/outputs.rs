//! Step outputs published for downstream workflow steps

use std::env;
use std::fs::OpenOptions;
use std::io::Write;

use tracing::debug;

use crate::errors::ActionError;

const HEREDOC_DELIMITER: &str = "__FIREVIEW_OUTPUT__";

/// Publish a step output by appending to the `GITHUB_OUTPUT` file.
/// A missing file (e.g. running outside a workflow) is not an error.
pub fn set_output(name: &str, value: &str) -> Result<(), ActionError> {
    let Some(path) = env::var_os("GITHUB_OUTPUT") else {
        debug!("GITHUB_OUTPUT is not set, skipping output {}", name);
        return Ok(());
    };
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    append_output(&mut file, name, value)
}

fn append_output(sink: &mut impl Write, name: &str, value: &str) -> Result<(), ActionError> {
    if value.contains('\n') {
        writeln!(sink, "{name}<<{HEREDOC_DELIMITER}")?;
        writeln!(sink, "{value}")?;
        writeln!(sink, "{HEREDOC_DELIMITER}")?;
    } else {
        writeln!(sink, "{name}={value}")?;
    }
    Ok(())
}
