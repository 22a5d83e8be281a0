//! Extraction engine - streams a carved byte range out to an image file.
//!
//! Raw-device backends reject positioned reads that are not sector-aligned,
//! so the engine seeks to the sector boundary at or below the image offset
//! and discards the sub-sector lead with a throwaway read before copying.

use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use thiserror::Error;

use crate::config::CarveConfig;
use crate::index::DiscImage;

/// An extraction failure is fatal to that one image only; queued
/// extractions continue.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The source ran out before `expected` bytes were delivered. The
    /// partial destination file is left in place.
    #[error("source exhausted after {written} of {expected} bytes")]
    ShortRead { written: u64, expected: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How an extraction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Exactly `bytes` were written to the destination.
    Completed { bytes: u64 },
    /// The destination already existed and was left untouched.
    SkippedExisting,
}

/// Streams image payloads from the source device to destination files.
pub struct Extractor {
    config: CarveConfig,
}

impl Extractor {
    pub fn new(config: CarveConfig) -> Self {
        Self { config }
    }

    /// Copy `image.size` bytes starting at `image.offset` from `source`
    /// into a new file at `dest`. `on_progress(written, total)` fires after
    /// every chunk.
    pub fn extract<R, F>(
        &self,
        source: &mut R,
        image: &DiscImage,
        dest: &Path,
        mut on_progress: F,
    ) -> Result<ExtractOutcome, ExtractError>
    where
        R: Read + Seek,
        F: FnMut(u64, u64),
    {
        if dest.exists() {
            tracing::info!(dest = %dest.display(), "Destination exists, skipping");
            return Ok(ExtractOutcome::SkippedExisting);
        }

        let aligned = self.config.align_down(image.offset);
        source.seek(SeekFrom::Start(aligned))?;

        // Burn off the lead between the sector boundary and the true start.
        let mut lead = (image.offset - aligned) as usize;
        let mut buf = vec![0u8; self.config.chunk_size];
        while lead > 0 {
            let n = source.read(&mut buf[..lead])?;
            if n == 0 {
                return Err(ExtractError::ShortRead {
                    written: 0,
                    expected: image.size,
                });
            }
            lead -= n;
        }

        tracing::info!(
            offset = image.offset,
            size = image.size,
            dest = %dest.display(),
            "Extracting image"
        );

        let file = File::create(dest)?;
        let mut writer = BufWriter::new(file);
        let mut written = 0u64;

        while written < image.size {
            let want = ((image.size - written) as usize).min(buf.len());
            let n = source.read(&mut buf[..want])?;
            if n == 0 {
                writer.flush()?;
                tracing::warn!(
                    written,
                    expected = image.size,
                    "Source exhausted mid-extraction"
                );
                return Err(ExtractError::ShortRead {
                    written,
                    expected: image.size,
                });
            }
            writer.write_all(&buf[..n])?;
            written += n as u64;
            on_progress(written, image.size);
        }

        writer.flush()?;
        Ok(ExtractOutcome::Completed { bytes: written })
    }
}
