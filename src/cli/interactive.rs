//! Interactive session - the default scan/select/extract workflow.
//!
//! Mirrors the classic recovery flow: load the cached index (or scan the
//! device), show a numbered menu, take a selection, extract.

use anyhow::{bail, Result};
use colored::Colorize;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};

use crate::checkpoint::CheckpointStore;
use crate::config::{CarveConfig, UserConfig};
use crate::index::{self, DiscImage, IndexError};

use super::commands;
use super::{parse_selection, Cli, Selection};

pub fn run_session(cli: &Cli, user: &UserConfig) -> Result<()> {
    let config = CarveConfig::default();
    let term = Term::stdout();
    let _ = term.clear_screen();
    print_banner();

    let dest = commands::resolve_dest(cli, user)?;
    let images = load_or_scan(cli, user, &config, &dest)?;

    if images.is_empty() {
        println!("{}", "No titles found.".yellow());
        return Ok(());
    }

    commands::print_title_table(&images);

    let selection = loop {
        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Choose number, list (1,3) or 'all' ('q' to quit)")
            .interact_text()?;
        match parse_selection(&input, images.len()) {
            Ok(selection) => break selection,
            Err(e) => println!("{} {}", "✗".red(), e),
        }
    };

    let selected: Vec<DiscImage> = match selection {
        Selection::Quit => return Ok(()),
        Selection::All => images,
        Selection::Indices(indices) => indices.into_iter().map(|i| images[i].clone()).collect(),
    };

    let disk = commands::resolve_disk(cli)?;
    let summary = commands::extract_images(&disk, &dest, &selected, &config)?;
    commands::print_extract_summary(&summary);

    Ok(())
}

fn print_banner() {
    let banner = r#"
╔══════════════════════════════════════════════════════════════╗
║  WODE CARVER - Wii / GameCube disc image recovery            ║
║                                                              ║
║  Scan a raw drive dump, pick titles, extract ISOs.           ║
║  The source device is only ever opened read-only.            ║
╚══════════════════════════════════════════════════════════════╝
"#;
    println!("{}", banner.bright_cyan());
}

/// Reuse the cached index when possible, scan otherwise.
///
/// A corrupt index is reported and treated as absent (the scan replaces it);
/// with `--skip-scan` there is nothing to fall back to, so both a corrupt
/// and a missing index are fatal.
fn load_or_scan(
    cli: &Cli,
    user: &UserConfig,
    config: &CarveConfig,
    dest: &std::path::Path,
) -> Result<Vec<DiscImage>> {
    if !cli.force_scan {
        match index::load(dest) {
            Ok(images) => {
                println!(
                    "{} Loaded index from {} ({} titles)",
                    "✓".green(),
                    index::index_path(dest).display(),
                    images.len()
                );
                return Ok(images);
            }
            Err(IndexError::Missing { .. }) => {}
            Err(e @ IndexError::Corrupt { .. }) => {
                if cli.skip_scan {
                    bail!("{e}; scanning disabled with --skip-scan");
                }
                println!("{} {}; rescanning", "⚠".yellow(), e);
            }
            Err(e) => return Err(anyhow::Error::new(e)),
        }
    }

    if cli.skip_scan {
        bail!("No usable index and scanning disabled with --skip-scan; nothing to extract");
    }

    let disk = commands::resolve_disk(cli)?;

    let store = CheckpointStore::new(dest);
    let resume = match store.load(&disk)? {
        Some(cp) => Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "An interrupted scan left off at {} with {} title(s) found. Resume it?",
                humansize::format_size(cp.cursor, humansize::BINARY),
                cp.images.len()
            ))
            .default(true)
            .interact()?,
        None => false,
    };

    println!("\n{} Scanning {} ...", "»".cyan(), disk.display());
    commands::scan_device(&disk, dest, config, resume, user.checkpoint_interval, None)
}
