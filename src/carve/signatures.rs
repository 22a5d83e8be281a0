//! Disc format signatures and header parsing.
//!
//! Both supported formats carry a fixed 4-byte magic a known distance into
//! the image, so detection is a byte search rather than filesystem parsing.
//! Header fields are extracted tolerantly: dumps recovered from a WODE drive
//! frequently have partially overwritten headers, and a garbled title must
//! never abort a scan.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wii disc magic, found 24 bytes into the image header.
pub const WII_MAGIC: [u8; 4] = [0x5D, 0x1C, 0x9E, 0xA3];

/// GameCube disc magic, found 28 bytes into the image header.
pub const GC_MAGIC: [u8; 4] = [0xC2, 0x33, 0x9F, 0x3D];

/// Length of the header window read for metadata extraction.
pub const HEADER_LEN: usize = 128;

/// Game ID occupies the first 6 header bytes.
const ID_LEN: usize = 6;

/// Display title occupies header bytes 32..96.
const TITLE_START: usize = 32;
const TITLE_END: usize = 96;

/// Fallback pair for headers that cannot be read.
pub const FALLBACK_ID: &str = "UNK";
pub const FALLBACK_TITLE: &str = "Unknown";

/// The two disc formats a WODE dump can contain.
///
/// Serialized as `"WII"` / `"GC"` to stay byte-compatible with index files
/// written by earlier versions of this tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscFormat {
    #[serde(rename = "WII")]
    Wii,
    #[serde(rename = "GC")]
    GameCube,
}

impl DiscFormat {
    /// Magic bytes identifying this format.
    pub fn magic(&self) -> &'static [u8; 4] {
        match self {
            DiscFormat::Wii => &WII_MAGIC,
            DiscFormat::GameCube => &GC_MAGIC,
        }
    }

    /// Extension used for extracted images.
    pub fn extension(&self) -> &'static str {
        "iso"
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiscFormat::Wii => "Wii",
            DiscFormat::GameCube => "GameCube",
        }
    }
}

impl fmt::Display for DiscFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscFormat::Wii => write!(f, "WII"),
            DiscFormat::GameCube => write!(f, "GC"),
        }
    }
}

/// Find the earliest occurrence of either disc magic in `buf`.
///
/// Returns the buffer-relative position of the first matching magic and the
/// format it belongs to, or `None` if neither appears. When both magics occur,
/// the smaller position wins.
pub fn find_signature(buf: &[u8]) -> Option<(usize, DiscFormat)> {
    if buf.len() < 4 {
        return None;
    }
    for i in 0..=buf.len() - 4 {
        // First-byte check before the full compare keeps the common case cheap.
        match buf[i] {
            0x5D if buf[i..i + 4] == WII_MAGIC => return Some((i, DiscFormat::Wii)),
            0xC2 if buf[i..i + 4] == GC_MAGIC => return Some((i, DiscFormat::GameCube)),
            _ => {}
        }
    }
    None
}

/// Extract `(id, title)` from a header window.
///
/// Never fails: a window shorter than [`HEADER_LEN`] (truncated at a chunk
/// edge, or unreadable because the image start precedes the chunk) yields
/// the `("UNK", "Unknown")` fallback pair. A full-length window decodes
/// tolerantly - non-ASCII and non-printable bytes are dropped, NULs and
/// surrounding whitespace trimmed - so a garbled header may produce empty
/// strings rather than an error.
pub fn parse_header(window: &[u8]) -> (String, String) {
    if window.len() < HEADER_LEN {
        return (FALLBACK_ID.to_string(), FALLBACK_TITLE.to_string());
    }

    let id = decode_region(&window[..ID_LEN]);
    let title = decode_region(&window[TITLE_START..TITLE_END]);
    (id, title)
}

/// Decode a header region as ASCII, dropping everything unprintable.
fn decode_region(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .copied()
        .filter(|b| b.is_ascii_graphic() || *b == b' ')
        .map(char::from)
        .collect();
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn window_with(id: &[u8], title: &[u8]) -> Vec<u8> {
        let mut w = vec![0u8; HEADER_LEN];
        w[..id.len()].copy_from_slice(id);
        w[TITLE_START..TITLE_START + title.len()].copy_from_slice(title);
        w
    }

    #[test]
    fn no_magic_means_no_match() {
        let buf = vec![0u8; 4096];
        assert_eq!(find_signature(&buf), None);
    }

    #[test]
    fn finds_planted_wii_magic() {
        let mut buf = vec![0u8; 4096];
        buf[700..704].copy_from_slice(&WII_MAGIC);
        assert_eq!(find_signature(&buf), Some((700, DiscFormat::Wii)));
    }

    #[test]
    fn finds_planted_gc_magic() {
        let mut buf = vec![0u8; 4096];
        buf[1200..1204].copy_from_slice(&GC_MAGIC);
        assert_eq!(find_signature(&buf), Some((1200, DiscFormat::GameCube)));
    }

    #[test]
    fn earliest_magic_wins_when_both_present() {
        let mut buf = vec![0u8; 4096];
        buf[100..104].copy_from_slice(&GC_MAGIC);
        buf[2000..2004].copy_from_slice(&WII_MAGIC);
        assert_eq!(find_signature(&buf), Some((100, DiscFormat::GameCube)));
    }

    #[test]
    fn magic_at_last_possible_position() {
        let mut buf = vec![0u8; 64];
        buf[60..64].copy_from_slice(&WII_MAGIC);
        assert_eq!(find_signature(&buf), Some((60, DiscFormat::Wii)));
    }

    #[test]
    fn buffer_shorter_than_magic() {
        assert_eq!(find_signature(&[0x5D, 0x1C, 0x9E]), None);
        assert_eq!(find_signature(&[]), None);
    }

    #[test]
    fn parses_id_and_title() {
        let w = window_with(b"RMGE01", b"Super Mario Galaxy\0\0\0");
        assert_eq!(
            parse_header(&w),
            ("RMGE01".to_string(), "Super Mario Galaxy".to_string())
        );
    }

    #[test]
    fn title_trims_trailing_nuls_and_spaces() {
        let w = window_with(b"GALE01", b"  Smash Bros  \0\0\0\0");
        let (_, title) = parse_header(&w);
        assert_eq!(title, "Smash Bros");
    }

    #[test]
    fn garbled_bytes_are_dropped_not_fatal() {
        let mut w = window_with(b"R\xFFM\xFEG\x01", b"Zel\xF0da\x07");
        w[40] = 0x80;
        let (id, title) = parse_header(&w);
        assert_eq!(id, "RMG");
        assert_eq!(title, "Zelda");
    }

    #[test]
    fn short_window_yields_fallback_pair() {
        assert_eq!(
            parse_header(&[0u8; 64]),
            (FALLBACK_ID.to_string(), FALLBACK_TITLE.to_string())
        );
        assert_eq!(
            parse_header(&[]),
            (FALLBACK_ID.to_string(), FALLBACK_TITLE.to_string())
        );
    }

    #[test]
    fn format_serde_matches_legacy_index_strings() {
        assert_eq!(serde_json::to_string(&DiscFormat::Wii).unwrap(), "\"WII\"");
        assert_eq!(
            serde_json::to_string(&DiscFormat::GameCube).unwrap(),
            "\"GC\""
        );
        assert_eq!(
            serde_json::from_str::<DiscFormat>("\"GC\"").unwrap(),
            DiscFormat::GameCube
        );
    }

    proptest! {
        #[test]
        fn parse_header_never_panics(window in proptest::collection::vec(any::<u8>(), 0..512)) {
            let (id, title) = parse_header(&window);
            prop_assert!(id.len() <= ID_LEN || id == FALLBACK_ID);
            prop_assert!(title.is_ascii());
        }

        #[test]
        fn find_signature_never_panics(buf in proptest::collection::vec(any::<u8>(), 0..4096)) {
            if let Some((pos, format)) = find_signature(&buf) {
                prop_assert_eq!(&buf[pos..pos + 4], format.magic().as_slice());
            }
        }
    }
}
