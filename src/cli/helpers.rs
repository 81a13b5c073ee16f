//! Shared helper functions for CLI commands

use miette::{IntoDiagnostic, Result, WrapErr};
use std::io::Read;
use std::path::Path;

/// Path argument meaning standard input
pub const STDIN: &str = "-";

/// True when the path argument is `-`
pub fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == STDIN
}

/// Read a document from a file, or from stdin for `-`
///
/// Returns the name to show in diagnostics alongside the content.
pub fn read_input(path: &Path) -> Result<(String, String)> {
    if is_stdin(path) {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .into_diagnostic()
            .wrap_err("Failed to read standard input")?;
        return Ok(("<stdin>".to_string(), content));
    }

    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    Ok((path.display().to_string(), content))
}

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
