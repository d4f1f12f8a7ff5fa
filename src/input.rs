use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Split a candidate list into one address string per line.
///
/// Lines are taken literally: no trimming, no validation, blank lines included.
/// Only the line terminator (`\n` or `\r\n`) is removed.
pub fn parse_candidates_str(s: &str) -> Vec<String> {
    s.lines().map(str::to_owned).collect()
}

/// Load the candidate list from a file path. Errors if the file cannot be read.
pub fn load_candidates_from_path(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read candidate file: {}", path.as_ref().display()))?;
    Ok(parse_candidates_str(&content))
}
