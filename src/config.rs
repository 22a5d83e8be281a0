//! Scan/extraction parameters and user preferences.
//!
//! [`CarveConfig`] is the immutable context threaded through the scanner and
//! extractor: chunk size, sector size, and the per-format geometry. Defaults
//! carry the real WODE constants; tests inject synthetic sizes. [`UserConfig`]
//! is the optional `~/.wode-carver/config.toml` preferences file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::carve::signatures::DiscFormat;

/// Default read/copy chunk size: 32 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Default device sector size.
pub const DEFAULT_SECTOR_SIZE: u64 = 512;

/// Full size of a single-layer Wii disc image.
pub const WII_IMAGE_SIZE: u64 = 4_699_979_776;

/// Full size of a GameCube disc image.
pub const GC_IMAGE_SIZE: u64 = 1_459_978_240;

/// Geometry of one disc format: where its magic sits relative to the image
/// start, and how many bytes the full image occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatParams {
    /// Distance from the image's first byte to its magic signature.
    pub signature_offset: u64,
    /// Exact byte length to extract for this format.
    pub image_size: u64,
}

/// Immutable scan/extract context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarveConfig {
    /// Bytes read per scan/copy chunk.
    pub chunk_size: usize,
    /// Seek positions are constrained to multiples of this.
    pub sector_size: u64,
    pub wii: FormatParams,
    pub gamecube: FormatParams,
}

impl Default for CarveConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sector_size: DEFAULT_SECTOR_SIZE,
            wii: FormatParams {
                signature_offset: 24,
                image_size: WII_IMAGE_SIZE,
            },
            gamecube: FormatParams {
                signature_offset: 28,
                image_size: GC_IMAGE_SIZE,
            },
        }
    }
}

impl CarveConfig {
    /// Geometry for `format`.
    pub fn params(&self, format: DiscFormat) -> FormatParams {
        match format {
            DiscFormat::Wii => self.wii,
            DiscFormat::GameCube => self.gamecube,
        }
    }

    /// Round `pos` down to the nearest sector boundary.
    pub fn align_down(&self, pos: u64) -> u64 {
        pos / self.sector_size * self.sector_size
    }
}

/// User preferences from `~/.wode-carver/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Default destination directory when `--dest` is not given.
    pub default_dest: Option<PathBuf>,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Save a scan checkpoint every N chunks (0 = disabled).
    pub checkpoint_interval: u64,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            default_dest: None,
            log_level: "info".to_string(),
            checkpoint_interval: 8,
        }
    }
}

impl UserConfig {
    /// Load from the default path, or return defaults if absent/unreadable.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path()).unwrap_or_default()
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: UserConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        Ok(config)
    }

    /// Save to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wode-carver")
            .join("config.toml")
    }
}
