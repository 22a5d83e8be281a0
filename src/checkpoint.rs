//! Scan checkpoint - resume an interrupted pass without starting over.
//!
//! A multi-terabyte device scan can die hours in (USB resets, bad cables).
//! The checkpoint records the scan cursor and every image found so far, keyed
//! to the source path, so the next run continues from the last saved position.
//! It lives in the destination directory next to the index it will become,
//! and is cleared when a pass completes and the real index is written. JSON
//! (not a binary codec) so a half-finished recovery session stays debuggable.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::index::DiscImage;

/// Well-known checkpoint filename inside the destination directory.
pub const CHECKPOINT_FILE_NAME: &str = ".wode_scan_checkpoint.json";

/// Snapshot of an in-flight scan pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanCheckpoint {
    /// Blake3 of the source path, for cheap identity matching.
    pub source_hash: String,
    /// Source path (human-readable).
    pub source_path: String,
    /// Next device-absolute read position.
    pub cursor: u64,
    /// Images discovered before the interruption.
    pub images: Vec<DiscImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Checkpoint format version.
    pub version: u32,
}

impl ScanCheckpoint {
    const VERSION: u32 = 1;

    pub fn new(source: &Path) -> Self {
        Self {
            source_hash: hash_source(source),
            source_path: source.to_string_lossy().to_string(),
            cursor: 0,
            images: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: Self::VERSION,
        }
    }

    /// Record progress: the cursor to resume from and the images so far.
    pub fn update(&mut self, cursor: u64, images: &[DiscImage]) {
        self.cursor = cursor;
        self.images = images.to_vec();
        self.updated_at = Utc::now();
    }

    /// Does this checkpoint belong to `source`?
    pub fn matches_source(&self, source: &Path) -> bool {
        self.source_hash == hash_source(source)
    }
}

fn hash_source(source: &Path) -> String {
    hex::encode(&blake3::hash(source.to_string_lossy().as_bytes()).as_bytes()[..8])
}

/// Loads, saves and clears the checkpoint for one destination directory.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dest_dir: &Path) -> Self {
        Self {
            dir: dest_dir.to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CHECKPOINT_FILE_NAME)
    }

    /// Load the checkpoint if one exists and belongs to `source`.
    ///
    /// A version or source mismatch is not an error: the stale checkpoint is
    /// ignored and the scan starts fresh.
    pub fn load(&self, source: &Path) -> Result<Option<ScanCheckpoint>> {
        let path = self.path();

        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read checkpoint: {}", path.display()))?;

        let checkpoint: ScanCheckpoint = match serde_json::from_str(&data) {
            Ok(cp) => cp,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unparseable checkpoint, starting fresh");
                return Ok(None);
            }
        };

        if checkpoint.version != ScanCheckpoint::VERSION {
            tracing::warn!(
                expected = ScanCheckpoint::VERSION,
                found = checkpoint.version,
                "Checkpoint version mismatch, starting fresh"
            );
            return Ok(None);
        }

        if !checkpoint.matches_source(source) {
            tracing::warn!(
                checkpoint_source = %checkpoint.source_path,
                source = %source.display(),
                "Checkpoint belongs to a different source, starting fresh"
            );
            return Ok(None);
        }

        tracing::info!(
            cursor = checkpoint.cursor,
            images = checkpoint.images.len(),
            "Resuming scan from checkpoint"
        );

        Ok(Some(checkpoint))
    }

    pub fn save(&self, checkpoint: &ScanCheckpoint) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create checkpoint dir: {}", self.dir.display())
        })?;

        let path = self.path();
        let data =
            serde_json::to_string_pretty(checkpoint).context("Failed to serialize checkpoint")?;

        fs::write(&path, data)
            .with_context(|| format!("Failed to write checkpoint: {}", path.display()))?;

        tracing::debug!(cursor = checkpoint.cursor, "Checkpoint saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.path();

        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove checkpoint: {}", path.display()))?;
            tracing::info!(path = %path.display(), "Checkpoint cleared");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carve::signatures::DiscFormat;
    use tempfile::tempdir;

    fn sample_image() -> DiscImage {
        DiscImage {
            offset: 512,
            id: "GALE01".to_string(),
            name: "Melee".to_string(),
            format: DiscFormat::GameCube,
            size: 1_459_978_240,
        }
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let source = PathBuf::from("/dev/rdisk12");

        let mut cp = ScanCheckpoint::new(&source);
        cp.update(96 * 1024 * 1024, &[sample_image()]);
        store.save(&cp).unwrap();

        let loaded = store.load(&source).unwrap().unwrap();
        assert_eq!(loaded.cursor, 96 * 1024 * 1024);
        assert_eq!(loaded.images, vec![sample_image()]);
        assert!(loaded.matches_source(&source));
    }

    #[test]
    fn missing_checkpoint_is_none() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        assert!(store.load(Path::new("/dev/rdisk12")).unwrap().is_none());
    }

    #[test]
    fn different_source_is_ignored() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        let cp = ScanCheckpoint::new(Path::new("/dev/rdisk12"));
        store.save(&cp).unwrap();

        assert!(store.load(Path::new("/dev/rdisk13")).unwrap().is_none());
    }

    #[test]
    fn version_mismatch_is_ignored() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let source = PathBuf::from("/dev/rdisk12");

        let mut cp = ScanCheckpoint::new(&source);
        cp.version = 99;
        store.save(&cp).unwrap();

        assert!(store.load(&source).unwrap().is_none());
    }

    #[test]
    fn garbage_checkpoint_is_ignored_not_fatal() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        fs::write(store.path(), "][ nope").unwrap();

        assert!(store.load(Path::new("/dev/rdisk12")).unwrap().is_none());
    }

    #[test]
    fn clear_removes_the_artifact() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        let source = PathBuf::from("/dev/rdisk12");

        store.save(&ScanCheckpoint::new(&source)).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(store.load(&source).unwrap().is_none());
    }
}
