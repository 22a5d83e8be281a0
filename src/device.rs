//! Source device access.
//!
//! The source is opened strictly read-only. Everything this tool does is
//! recovery; a writable handle on the device being recovered is never
//! acceptable.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};

/// Open the source device or dump file read-only.
pub fn open_source(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(false)
        .open(path)
        .with_context(|| format!("Failed to open source: {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Opened source read-only");
    Ok(file)
}

/// Best-effort total size of the source, in bytes. 0 means unknown.
///
/// Regular files report through metadata. Block devices report a zero
/// metadata length on some platforms, so fall back to seeking to the end.
/// The handle is rewound before returning.
pub fn source_size(file: &mut File) -> u64 {
    let size = match file.metadata() {
        Ok(meta) if meta.len() > 0 => meta.len(),
        _ => file.seek(SeekFrom::End(0)).unwrap_or(0),
    };
    let _ = file.seek(SeekFrom::Start(0));
    size
}
