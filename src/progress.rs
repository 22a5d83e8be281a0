//! Progress bars for scanning and extraction.
//!
//! The engines emit plain byte-accounting events; everything visual lives
//! here so they stay testable without capturing terminal output.

use indicatif::{ProgressBar, ProgressStyle};

/// Bar for a scan pass. With a size hint it shows percentage, throughput and
/// ETA; without one it degrades to a byte-counting spinner.
pub fn scan_bar(total_size: u64) -> ProgressBar {
    if total_size > 0 {
        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.cyan} Scanning [{bar:25.cyan/blue}] {percent:>3}% | {bytes_per_sec} | ETA {eta}",
                )
                .unwrap()
                .progress_chars("█▓░"),
        );
        pb
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} Scanning {bytes} | {bytes_per_sec} | {elapsed_precise}")
                .unwrap(),
        );
        pb
    }
}

/// Bar for a single image extraction.
pub fn extract_bar(total_bytes: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "  [{bar:25.green/black}] {percent:>3}% | {bytes}/{total_bytes} | {bytes_per_sec} | ETA {eta}",
            )
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb
}
