//! Subcommand handlers shared by the direct CLI and the interactive session.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;

use crate::carve::signatures::DiscFormat;
use crate::carve::{DiscScanner, ScanEvent};
use crate::checkpoint::{CheckpointStore, ScanCheckpoint};
use crate::config::{CarveConfig, UserConfig};
use crate::device;
use crate::extract::{ExtractOutcome, Extractor};
use crate::index::{self, DiscImage, IndexError};
use crate::progress;

use super::{parse_selection, Cli, ExtractArgs, ListArgs, OutputFormat, ScanArgs, Selection};

/// Destination used when neither `--dest` nor the user config names one.
pub const DEFAULT_DEST: &str = "./extracted_games";

/// Counts from an extraction queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// The source device is mandatory for scanning and extraction.
pub fn resolve_disk(cli: &Cli) -> Result<PathBuf> {
    cli.disk
        .clone()
        .ok_or_else(|| anyhow!("No source specified. Pass --disk <device or dump file>."))
}

/// Resolve and create the destination directory.
pub fn resolve_dest(cli: &Cli, user: &UserConfig) -> Result<PathBuf> {
    let dest = cli
        .dest
        .clone()
        .or_else(|| user.default_dest.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DEST));
    fs::create_dir_all(&dest)
        .with_context(|| format!("Failed to create destination: {}", dest.display()))?;
    Ok(dest)
}

pub fn run_scan(cli: &Cli, args: &ScanArgs, user: &UserConfig) -> Result<()> {
    let config = CarveConfig::default();
    let disk = resolve_disk(cli)?;
    let dest = resolve_dest(cli, user)?;
    let interval = args.checkpoint_interval.unwrap_or(user.checkpoint_interval);

    let images = scan_device(&disk, &dest, &config, args.resume, interval, args.size_hint)?;

    if images.is_empty() {
        println!("{}", "No titles found.".yellow());
    } else {
        print_title_table(&images);
    }
    Ok(())
}

pub fn run_list(cli: &Cli, args: &ListArgs, user: &UserConfig) -> Result<()> {
    let dest = resolve_dest(cli, user)?;

    let images = match index::load(&dest) {
        Ok(images) => images,
        Err(e @ IndexError::Missing { .. }) => {
            bail!("{e}. Run `wode-carver scan` first.")
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Cannot read index")),
    };

    match args.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&images)?),
        OutputFormat::Human => {
            if images.is_empty() {
                println!("{}", "Index is empty.".yellow());
            } else {
                print_title_table(&images);
            }
        }
    }
    Ok(())
}

pub fn run_extract(cli: &Cli, args: &ExtractArgs, user: &UserConfig) -> Result<()> {
    let config = CarveConfig::default();
    let disk = resolve_disk(cli)?;
    let dest = resolve_dest(cli, user)?;

    // Manual mode bypasses the index entirely.
    if let Some(offset) = args.offset {
        let format: DiscFormat = args.format.into();
        let image = DiscImage {
            offset,
            id: args.id.clone(),
            name: "Manual Dump".to_string(),
            format,
            size: config.params(format).image_size,
        };
        println!(
            "{} Manual mode: extracting {} image from offset {}",
            "→".cyan(),
            format.name(),
            offset
        );
        let summary = extract_images(&disk, &dest, std::slice::from_ref(&image), &config)?;
        print_extract_summary(&summary);
        return Ok(());
    }

    let images = match index::load(&dest) {
        Ok(images) => images,
        Err(e @ IndexError::Missing { .. }) => {
            bail!("{e}. Run `wode-carver scan` first, or use --offset for manual mode.")
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Cannot read index")),
    };
    if images.is_empty() {
        println!("{}", "Index is empty; nothing to extract.".yellow());
        return Ok(());
    }

    let input = args.titles.join(",");
    let selection = parse_selection(&input, images.len())
        .map_err(|e| anyhow!("Invalid selection: {e}. Use indices like \"1,3\" or \"all\"."))?;
    let selected: Vec<DiscImage> = match selection {
        Selection::Quit => return Ok(()),
        Selection::All => images,
        Selection::Indices(indices) => indices.into_iter().map(|i| images[i].clone()).collect(),
    };

    let summary = extract_images(&disk, &dest, &selected, &config)?;
    print_extract_summary(&summary);
    Ok(())
}

/// Run one full scan pass and persist the index.
///
/// On a device I/O failure the pass aborts and **no index is written**; any
/// checkpoint saved along the way stays behind for `--resume`.
pub fn scan_device(
    disk: &Path,
    dest: &Path,
    config: &CarveConfig,
    resume: bool,
    checkpoint_interval: u64,
    size_hint: Option<u64>,
) -> Result<Vec<DiscImage>> {
    let mut source = device::open_source(disk)?;
    let total = size_hint.unwrap_or_else(|| device::source_size(&mut source));
    if total == 0 {
        tracing::warn!("Device size unknown; scanning until end-of-stream");
    }

    let store = CheckpointStore::new(dest);
    let (start, seed) = if resume {
        match store.load(disk)? {
            Some(cp) => (cp.cursor, cp.images),
            None => (0, Vec::new()),
        }
    } else {
        (0, Vec::new())
    };

    let bar = progress::scan_bar(total);
    bar.set_position(start);

    let scanner = DiscScanner::new(config.clone());
    let mut checkpoint = ScanCheckpoint::new(disk);
    let mut found = seed.clone();
    let mut chunks_since_save = 0u64;

    let result = scanner.scan_from(&mut source, total, start, seed, |event| match event {
        ScanEvent::Chunk { cursor, .. } => {
            bar.set_position(cursor);
            chunks_since_save += 1;
            if checkpoint_interval > 0 && chunks_since_save >= checkpoint_interval {
                chunks_since_save = 0;
                checkpoint.update(cursor, &found);
                if let Err(e) = store.save(&checkpoint) {
                    tracing::warn!(error = %e, "Failed to save checkpoint");
                }
            }
        }
        ScanEvent::Found { image, resume_at } => {
            bar.println(format!(
                "  {} [{}] {} - {}",
                "+".green(),
                image.format,
                image.id.bright_white(),
                image.name
            ));
            bar.set_position(resume_at);
            found.push(image);
            // A discovery is always worth persisting.
            checkpoint.update(resume_at, &found);
            if let Err(e) = store.save(&checkpoint) {
                tracing::warn!(error = %e, "Failed to save checkpoint");
            }
        }
        ScanEvent::Finished { .. } => bar.finish_and_clear(),
    });

    match result {
        Ok(images) => {
            index::save(&images, dest)?;
            store.clear()?;
            println!(
                "{} Scan complete: {} title(s) found",
                "✓".green(),
                images.len()
            );
            Ok(images)
        }
        Err(e) => {
            bar.finish_and_clear();
            eprintln!(
                "{} Scan aborted; the index was not written. Re-run with --resume to continue.",
                "✗".red()
            );
            Err(anyhow::Error::new(e).context("Device error during scan"))
        }
    }
}

/// Extract a queue of images. A failure on one image is reported and the
/// queue continues; existing destinations are skipped with a notice.
pub fn extract_images(
    disk: &Path,
    dest_dir: &Path,
    images: &[DiscImage],
    config: &CarveConfig,
) -> Result<ExtractSummary> {
    let mut source = device::open_source(disk)?;
    let extractor = Extractor::new(config.clone());
    let mut summary = ExtractSummary::default();

    for image in images {
        let filename = index::destination_filename(image);
        let dest = dest_dir.join(&filename);
        println!(
            "\n{} [{}] {} - {}",
            "→".cyan(),
            image.format,
            image.id.bright_white(),
            image.name
        );

        let bar = progress::extract_bar(image.size);
        let outcome = extractor.extract(&mut source, image, &dest, |written, _| {
            bar.set_position(written)
        });
        bar.finish_and_clear();

        match outcome {
            Ok(ExtractOutcome::Completed { bytes }) => {
                summary.extracted += 1;
                println!(
                    "  {} {} ({})",
                    "✓".green(),
                    filename,
                    humansize::format_size(bytes, humansize::BINARY)
                );
            }
            Ok(ExtractOutcome::SkippedExisting) => {
                summary.skipped += 1;
                println!("  {} {} already exists, skipping", "⚠".yellow(), filename);
            }
            Err(e) => {
                summary.failed += 1;
                eprintln!("  {} {}: {}", "✗".red(), filename, e);
            }
        }
    }

    Ok(summary)
}

/// Numbered table of discovered titles, in the index order.
pub fn print_title_table(images: &[DiscImage]) {
    let rule = "=".repeat(65);
    println!("\n{rule}");
    println!("AVAILABLE TITLES");
    println!("{rule}");
    for (i, image) in images.iter().enumerate() {
        println!(
            "{:2}. [{}] {} - {} ({})",
            i + 1,
            image.format.to_string().cyan(),
            image.id.bright_white(),
            image.name,
            humansize::format_size(image.size, humansize::BINARY).dimmed()
        );
    }
    println!("{rule}");
}

pub fn print_extract_summary(summary: &ExtractSummary) {
    println!(
        "\n{} extracted, {} skipped, {} failed",
        summary.extracted.to_string().green(),
        summary.skipped.to_string().yellow(),
        summary.failed.to_string().red()
    );
}
