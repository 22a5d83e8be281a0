//! Persisted index of discovered disc images.
//!
//! One `wode_index.json` per destination directory, an ordered JSON list of
//! records. The artifact decouples scanning from extraction: a later run
//! loads the index and never rescans the device unless asked to. JSON (not a
//! binary codec) so other tooling can consume it and the operator can read it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::carve::signatures::DiscFormat;

/// Well-known index filename inside the destination directory.
pub const INDEX_FILE_NAME: &str = "wode_index.json";

/// One discovered disc image. Created only by the scanner, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscImage {
    /// Absolute byte offset of the image's true start on the source device.
    pub offset: u64,
    /// Game ID from the header (may be empty or garbled, not unique).
    pub id: String,
    /// Display title from the header (may be empty or garbled).
    pub name: String,
    #[serde(rename = "type")]
    pub format: DiscFormat,
    /// Exact byte length to extract, fixed by the format.
    pub size: u64,
}

/// Why an index could not be loaded.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no index found at {path}")]
    Missing { path: PathBuf },

    #[error("corrupt index at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to read index at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Path of the index artifact for a destination directory.
pub fn index_path(dest_dir: &Path) -> PathBuf {
    dest_dir.join(INDEX_FILE_NAME)
}

/// Write the full ordered sequence, replacing any previous artifact.
pub fn save(images: &[DiscImage], dest_dir: &Path) -> anyhow::Result<PathBuf> {
    use anyhow::Context;

    let path = index_path(dest_dir);
    let data = serde_json::to_string_pretty(images).context("Failed to serialize index")?;
    fs::write(&path, data)
        .with_context(|| format!("Failed to write index: {}", path.display()))?;

    tracing::info!(path = %path.display(), images = images.len(), "Index saved");
    Ok(path)
}

/// Load the index back. The caller decides whether [`IndexError::Corrupt`]
/// means "rescan" or "abort".
pub fn load(dest_dir: &Path) -> Result<Vec<DiscImage>, IndexError> {
    let path = index_path(dest_dir);

    let data = match fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(IndexError::Missing { path });
        }
        Err(e) => return Err(IndexError::Io { path, source: e }),
    };

    serde_json::from_str(&data).map_err(|source| IndexError::Corrupt { path, source })
}

/// Derive the output filename for an image: `{id}_{sanitized name}.iso`.
///
/// Only alphanumerics, spaces, underscores and hyphens survive
/// sanitization; spaces then become underscores.
pub fn destination_filename(image: &DiscImage) -> String {
    let clean: String = image
        .name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();
    format!(
        "{}_{}.{}",
        image.id,
        clean.replace(' ', "_"),
        image.format.extension()
    )
}
