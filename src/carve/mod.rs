//! Disc image carving - locate embedded images by signature scanning.
//!
//! Walks the source device in fixed-size chunks, looking for the Wii and
//! GameCube magics, reconstructing each image's true start from the known
//! signature distance, and skipping over the full payload of every discovery
//! so image contents are never rescanned.
//!
//! # Design
//!
//! - **Chunked streaming**: 32 MiB sequential reads, never a whole-device
//!   buffer and never mmap - raw block devices only support plain reads.
//! - **Single-threaded**: the scan holds the device handle exclusively and
//!   reads strictly forward; cheap USB bridges behave badly under seeky
//!   parallel access.
//! - **Header from the chunk**: metadata is sliced from the bytes already in
//!   memory. A second positioned read for the header would be redundant I/O
//!   and can fail outright on raw-device paths with unaligned offsets.
//! - **Observer callback**: progress is emitted as [`ScanEvent`]s; the
//!   scanner itself never formats output.
//!
//! A magic whose 4 bytes straddle two chunk reads is not detected; the scan
//! has no cross-chunk carry-over.

pub mod signatures;

use std::io::{self, Read, Seek, SeekFrom};

use thiserror::Error;

use crate::config::CarveConfig;
use crate::index::DiscImage;
use signatures::{find_signature, parse_header, FALLBACK_ID, FALLBACK_TITLE, HEADER_LEN};

/// A device I/O failure is fatal to the whole pass; no index is written.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("device read failed at offset {at}: {source}")]
    Read { at: u64, source: io::Error },

    #[error("device seek to offset {at} failed: {source}")]
    Seek { at: u64, source: io::Error },
}

/// Progress events emitted during a scan pass.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// A chunk was consumed without a match; `cursor` is the next read
    /// position. `total` is the size hint (0 = unknown).
    Chunk { cursor: u64, total: u64 },
    /// An image was discovered; the scan resumes at `resume_at`.
    Found { image: DiscImage, resume_at: u64 },
    /// The pass ended normally.
    Finished { bytes_scanned: u64, images: usize },
}

/// The signature scanner.
pub struct DiscScanner {
    config: CarveConfig,
}

impl DiscScanner {
    pub fn new(config: CarveConfig) -> Self {
        Self { config }
    }

    /// Scan `source` from byte 0.
    ///
    /// `total_size` is the device-size hint: it bounds the pass and feeds
    /// progress percentages; 0 means unknown and the scan runs until
    /// end-of-stream.
    pub fn scan<R, F>(
        &self,
        source: &mut R,
        total_size: u64,
        on_event: F,
    ) -> Result<Vec<DiscImage>, ScanError>
    where
        R: Read + Seek,
        F: FnMut(ScanEvent),
    {
        self.scan_from(source, total_size, 0, Vec::new(), on_event)
    }

    /// Scan starting at `start_cursor`, seeded with images already found -
    /// the resume path for an interrupted pass.
    pub fn scan_from<R, F>(
        &self,
        source: &mut R,
        total_size: u64,
        start_cursor: u64,
        seed: Vec<DiscImage>,
        mut on_event: F,
    ) -> Result<Vec<DiscImage>, ScanError>
    where
        R: Read + Seek,
        F: FnMut(ScanEvent),
    {
        let cfg = &self.config;
        let mut images = seed;
        let mut cursor = start_cursor;
        let mut chunk = vec![0u8; cfg.chunk_size];

        tracing::info!(
            start = start_cursor,
            total_size,
            chunk_size = cfg.chunk_size,
            seeded = images.len(),
            "Starting signature scan"
        );

        source
            .seek(SeekFrom::Start(cursor))
            .map_err(|source| ScanError::Seek { at: cursor, source })?;

        loop {
            let read = read_full(source, &mut chunk)
                .map_err(|source| ScanError::Read { at: cursor, source })?;
            if read == 0 {
                break;
            }
            let chunk_start = cursor;
            let buf = &chunk[..read];

            match find_signature(buf) {
                None => {
                    cursor += read as u64;
                    on_event(ScanEvent::Chunk {
                        cursor,
                        total: total_size,
                    });
                    if total_size > 0 && cursor >= total_size {
                        break;
                    }
                }
                Some((pos, format)) => {
                    let params = cfg.params(format);
                    let relative = pos as i64 - params.signature_offset as i64;
                    // An image start before byte 0 cannot exist; clamp and
                    // fall back to the unknown header below.
                    let true_start = (chunk_start as i64 + relative).max(0) as u64;

                    let (id, name) = if relative >= 0 {
                        let start = relative as usize;
                        let end = (start + HEADER_LEN).min(buf.len());
                        parse_header(&buf[start..end])
                    } else {
                        // The image started in an already-consumed chunk;
                        // its header is no longer in memory.
                        (FALLBACK_ID.to_string(), FALLBACK_TITLE.to_string())
                    };

                    let image = DiscImage {
                        offset: true_start,
                        id,
                        name,
                        format,
                        size: params.image_size,
                    };

                    tracing::info!(
                        offset = image.offset,
                        format = %image.format,
                        id = %image.id,
                        name = %image.name,
                        "Discovered disc image"
                    );

                    // Skip the whole payload. Rounding DOWN keeps the next
                    // read position inside the device when the image size is
                    // not sector-aligned, at the cost of re-reading at most
                    // one sector of image tail.
                    let next = true_start + params.image_size;
                    let aligned = cfg.align_down(next);

                    on_event(ScanEvent::Found {
                        image: image.clone(),
                        resume_at: aligned,
                    });
                    images.push(image);

                    if total_size > 0 && aligned >= total_size {
                        cursor = aligned;
                        break;
                    }
                    source
                        .seek(SeekFrom::Start(aligned))
                        .map_err(|source| ScanError::Seek { at: aligned, source })?;
                    cursor = aligned;
                }
            }
        }

        tracing::info!(
            bytes_scanned = cursor,
            images = images.len(),
            "Signature scan complete"
        );
        on_event(ScanEvent::Finished {
            bytes_scanned: cursor,
            images: images.len(),
        });

        Ok(images)
    }
}

/// Fill `buf` from `source`, stopping early only at end-of-stream.
/// Returns the number of bytes actually read.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatParams;
    use signatures::{DiscFormat, GC_MAGIC, WII_MAGIC};
    use std::io::Cursor;

    /// Small synthetic geometry so fixtures stay in the kilobyte range.
    fn test_config() -> CarveConfig {
        CarveConfig {
            chunk_size: 64 * 1024,
            sector_size: 512,
            wii: FormatParams {
                signature_offset: 24,
                image_size: 300_000,
            },
            gamecube: FormatParams {
                signature_offset: 28,
                image_size: 150_000,
            },
        }
    }

    /// A plausible 128-byte header for `format`: id, magic, title.
    fn synthetic_header(format: DiscFormat, id: &[u8], title: &[u8]) -> Vec<u8> {
        let cfg = test_config();
        let mut header = vec![0u8; HEADER_LEN];
        header[..id.len()].copy_from_slice(id);
        let sig_off = cfg.params(format).signature_offset as usize;
        header[sig_off..sig_off + 4].copy_from_slice(format.magic());
        header[32..32 + title.len()].copy_from_slice(title);
        header
    }

    fn scan_all(cfg: &CarveConfig, data: &[u8]) -> Vec<DiscImage> {
        let scanner = DiscScanner::new(cfg.clone());
        let mut cursor = Cursor::new(data.to_vec());
        scanner
            .scan(&mut cursor, data.len() as u64, |_| {})
            .unwrap()
    }

    #[test]
    fn empty_source_produces_no_records() {
        let cfg = test_config();
        assert!(scan_all(&cfg, &[]).is_empty());
    }

    #[test]
    fn signatureless_source_consumes_exact_length_and_finds_nothing() {
        let cfg = test_config();
        let data = vec![0xAAu8; cfg.chunk_size * 3 + 777];

        let scanner = DiscScanner::new(cfg.clone());
        let mut src = Cursor::new(data.clone());
        let mut final_cursor = 0;
        let images = scanner
            .scan(&mut src, data.len() as u64, |ev| {
                if let ScanEvent::Finished { bytes_scanned, .. } = ev {
                    final_cursor = bytes_scanned;
                }
            })
            .unwrap();

        assert!(images.is_empty());
        assert_eq!(final_cursor, data.len() as u64);
    }

    #[test]
    fn discovers_wii_image_after_filler_and_skips_payload() {
        let cfg = test_config();
        let filler = 1024 * 1024;
        let image_size = cfg.wii.image_size as usize;

        let mut data = vec![0u8; filler];
        data.extend_from_slice(&synthetic_header(
            DiscFormat::Wii,
            b"RMGE01",
            b"Super Mario Galaxy",
        ));
        data.resize(filler + image_size, 0x11);
        // Decoy magic inside the payload must never be reported.
        let decoy = filler + image_size / 2;
        data[decoy..decoy + 4].copy_from_slice(&GC_MAGIC);
        data.extend_from_slice(&vec![0u8; 1024 * 1024]);

        let images = scan_all(&cfg, &data);

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].offset, filler as u64);
        assert_eq!(images[0].format, DiscFormat::Wii);
        assert_eq!(images[0].id, "RMGE01");
        assert_eq!(images[0].name, "Super Mario Galaxy");
        assert_eq!(images[0].size, cfg.wii.image_size);
    }

    #[test]
    fn discovers_two_images_in_sequence() {
        let cfg = test_config();
        let first_at = 4096usize;
        let mut data = vec![0u8; first_at];
        data.extend_from_slice(&synthetic_header(DiscFormat::Wii, b"RMGE01", b"Galaxy"));
        data.resize(first_at + cfg.wii.image_size as usize, 0);

        // Second image starts on the sector boundary right after the first.
        let second_at = data.len().next_multiple_of(512);
        data.resize(second_at, 0);
        data.extend_from_slice(&synthetic_header(DiscFormat::GameCube, b"GALE01", b"Melee"));
        data.resize(second_at + cfg.gamecube.image_size as usize, 0);

        let images = scan_all(&cfg, &data);

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].offset, first_at as u64);
        assert_eq!(images[0].format, DiscFormat::Wii);
        assert_eq!(images[1].offset, second_at as u64);
        assert_eq!(images[1].format, DiscFormat::GameCube);
        assert_eq!(images[1].id, "GALE01");
    }

    #[test]
    fn resume_skip_is_rounded_down_to_sector() {
        let cfg = test_config();
        // 300_000 is not a multiple of 512: skip target must round down.
        let mut data = synthetic_header(DiscFormat::Wii, b"RMGE01", b"Galaxy");
        data.resize(cfg.wii.image_size as usize + 4096, 0);

        let scanner = DiscScanner::new(cfg.clone());
        let mut src = Cursor::new(data.clone());
        let mut resume = None;
        scanner
            .scan(&mut src, data.len() as u64, |ev| {
                if let ScanEvent::Found { resume_at, .. } = ev {
                    resume = Some(resume_at);
                }
            })
            .unwrap();

        assert_eq!(resume, Some(cfg.align_down(cfg.wii.image_size)));
        assert_eq!(resume.unwrap() % 512, 0);
        assert!(resume.unwrap() <= cfg.wii.image_size);
    }

    #[test]
    fn match_near_chunk_end_degrades_header_to_fallback() {
        let cfg = test_config();
        // Place the magic so the image start is in-chunk but the 128-byte
        // window runs off the end of the data.
        let image_at = cfg.chunk_size - 64;
        let mut data = vec![0u8; image_at];
        let header = synthetic_header(DiscFormat::Wii, b"RMGE01", b"Galaxy");
        data.extend_from_slice(&header[..64]);

        let images = scan_all(&cfg, &data);

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].offset, image_at as u64);
        assert_eq!(images[0].id, FALLBACK_ID);
        assert_eq!(images[0].name, FALLBACK_TITLE);
    }

    #[test]
    fn magic_in_first_bytes_clamps_start_to_zero() {
        let cfg = test_config();
        // Magic at position 10 < signature_offset 24: computed start is
        // negative, clamped to 0, header unknown.
        let mut data = vec![0u8; 8192];
        data[10..14].copy_from_slice(&WII_MAGIC);

        let images = scan_all(&cfg, &data);

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].offset, 0);
        assert_eq!(images[0].id, FALLBACK_ID);
    }

    #[test]
    fn size_hint_bounds_the_pass() {
        let cfg = test_config();
        let mut data = synthetic_header(DiscFormat::Wii, b"RMGE01", b"Galaxy");
        data.resize(cfg.wii.image_size as usize, 0);
        let declared = data.len() as u64;
        // Stale data past the declared device size: a magic out there must
        // not be reported once the known size is exhausted.
        data.resize(declared as usize + 2 * cfg.chunk_size, 0);
        let stale = declared as usize + cfg.chunk_size + 512;
        data[stale..stale + 4].copy_from_slice(&GC_MAGIC);

        let scanner = DiscScanner::new(cfg.clone());
        let mut src = Cursor::new(data);
        let images = scanner.scan(&mut src, declared, |_| {}).unwrap();

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].format, DiscFormat::Wii);
    }

    #[test]
    fn scan_from_resumes_past_consumed_region() {
        let cfg = test_config();
        let first_at = 1024usize;
        let mut data = vec![0u8; first_at];
        data.extend_from_slice(&synthetic_header(DiscFormat::GameCube, b"GALE01", b"Melee"));
        data.resize(first_at + cfg.gamecube.image_size as usize + 4096, 0);

        let seed = vec![DiscImage {
            offset: 64,
            id: "SEED01".to_string(),
            name: "Already Found".to_string(),
            format: DiscFormat::Wii,
            size: cfg.wii.image_size,
        }];

        let scanner = DiscScanner::new(cfg.clone());
        let mut src = Cursor::new(data.clone());
        let images = scanner
            .scan_from(&mut src, data.len() as u64, 512, seed, |_| {})
            .unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].id, "SEED01");
        assert_eq!(images[1].offset, first_at as u64);
    }

    #[test]
    fn read_full_assembles_short_reads() {
        // Cursor never short-reads mid-stream, but a chain of one-byte
        // readers exercises the fill loop.
        struct OneByte<R>(R);
        impl<R: Read> Read for OneByte<R> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if buf.is_empty() {
                    return Ok(0);
                }
                self.0.read(&mut buf[..1])
            }
        }

        let mut src = OneByte(Cursor::new(vec![7u8; 100]));
        let mut buf = [0u8; 64];
        assert_eq!(read_full(&mut src, &mut buf).unwrap(), 64);
        assert!(buf.iter().all(|&b| b == 7));

        let mut buf2 = [0u8; 64];
        assert_eq!(read_full(&mut src, &mut buf2).unwrap(), 36);
    }
}
