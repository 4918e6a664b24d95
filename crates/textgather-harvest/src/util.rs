//! Small shared helpers for the ledger files.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat};

/// Local timestamp with timezone offset, RFC 3339.
pub fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Display form of an artifact path: immediate parent directory plus
/// filename, never an absolute path.
pub fn display_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path
        .parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{parent}/{name}")
}

/// Whole-file rewrite through a temp file + rename, so a crash mid-write
/// never leaves a truncated ledger behind.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
