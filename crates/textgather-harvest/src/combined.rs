//! Append-only combined text file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Delimiter line marking the start of one item's text; carries the pid of
/// the item that actually supplied the bytes.
pub fn delimiter_line(pid: &str) -> String {
    format!("---|||start-of-pid:{pid}|||---")
}

/// The single growing output file. Blocks are only ever appended, so a
/// crash damages at most the tail of the most recent write.
pub struct CombinedText {
    path: PathBuf,
}

impl CombinedText {
    /// Open (creating if absent, so a resumed run always has the file).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open combined text file {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one delimited block; trailing newlines of the text are
    /// normalized to exactly one. Returns the measured text size in bytes.
    pub fn append(&self, pid: &str, text: &str) -> Result<u64> {
        let body = text.trim_end_matches('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("cannot open combined text file {}", self.path.display()))?;
        writeln!(file, "{}", delimiter_line(pid))
            .and_then(|_| writeln!(file, "{body}"))
            .with_context(|| format!("cannot append to {}", self.path.display()))?;
        Ok(body.len() as u64)
    }

    /// Current on-disk size in bytes (0 if the file vanished).
    pub fn size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}
