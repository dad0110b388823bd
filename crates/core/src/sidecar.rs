//! Output directory inspection.

use crate::constants::SIDECAR_PATTERN;
use crate::ConverterResult;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns true when `dir` can be listed and holds at least one entry.
///
/// A directory that does not exist and one that cannot be read are treated the same way:
/// neither counts as previous output.
pub fn has_previous_output(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}

/// Lists the JSON sidecars directly inside `dir`, sorted by path.
///
/// Only file names are matched against the pattern, so `dir` itself may hold any bytes.
/// Subdirectories are not searched, hidden files are skipped and entries that cannot be
/// read are ignored. A missing directory yields an empty list.
pub fn collect_sidecars(dir: &Path) -> ConverterResult<Vec<PathBuf>> {
    let pattern = Pattern::new(SIDECAR_PATTERN)?;
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(Vec::new()),
    };

    let mut sidecars: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| pattern.matches_with(&entry.file_name().to_string_lossy(), options))
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    sidecars.sort();

    Ok(sidecars)
}
