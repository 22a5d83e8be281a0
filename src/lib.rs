//! WODE Carver Library
//!
//! Recovers Wii and GameCube disc images embedded at unknown offsets inside
//! raw WODE drive dumps: scans for the formats' magic signatures, caches the
//! discoveries in a JSON index, and streams selected titles out to `.iso`
//! files.
//!
//! # Features
//!
//! - **Streaming scan**: 32 MiB chunked reads, never a whole-device buffer
//! - **Read-only safe**: the source device is never opened writable
//! - **Resumable**: scan checkpoints survive interruptions
//! - **Decoupled extraction**: the persisted index means later runs never
//!   rescan
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use wode_carver::{CarveConfig, DiscScanner};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = CarveConfig::default();
//!     let mut source = wode_carver::device::open_source(Path::new("wode.img"))?;
//!     let total = wode_carver::device::source_size(&mut source);
//!
//!     let images = DiscScanner::new(config).scan(&mut source, total, |_| {})?;
//!     println!("Found {} titles", images.len());
//!     Ok(())
//! }
//! ```

pub mod carve;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod device;
pub mod extract;
pub mod index;
pub mod progress;

// Re-export commonly used types
pub use carve::signatures::{DiscFormat, FALLBACK_ID, FALLBACK_TITLE};
pub use carve::{DiscScanner, ScanError, ScanEvent};
pub use checkpoint::{CheckpointStore, ScanCheckpoint};
pub use config::{CarveConfig, FormatParams, UserConfig};
pub use extract::{ExtractError, ExtractOutcome, Extractor};
pub use index::{DiscImage, IndexError};
