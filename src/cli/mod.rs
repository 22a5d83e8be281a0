//! CLI module - command line interface definitions and selection parsing.

pub mod commands;
pub mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use crate::carve::signatures::DiscFormat;

/// wode-carver - recover Wii and GameCube disc images from raw WODE dumps
///
/// Scans a raw device or dump file for embedded disc images, caches the
/// discoveries in an index, and extracts selected titles to .iso files.
/// The source is only ever opened read-only.
#[derive(Parser, Debug)]
#[command(name = "wode-carver")]
#[command(version)]
#[command(about = "Recover Wii and GameCube disc images from raw WODE drive dumps", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Source device or dump file (e.g. /dev/rdisk12 or wode.img)
    #[arg(long, short, global = true)]
    pub disk: Option<PathBuf>,

    /// Destination directory for the index and extracted images
    #[arg(long, short = 'o', global = true)]
    pub dest: Option<PathBuf>,

    /// Ignore any cached index and rescan the device
    #[arg(long, global = true)]
    pub force_scan: bool,

    /// Never scan; fail if no usable index exists
    #[arg(long, global = true)]
    pub skip_scan: bool,

    /// Verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the source device and write the index
    Scan(ScanArgs),

    /// List the titles recorded in the index
    List(ListArgs),

    /// Extract titles from the source device
    Extract(ExtractArgs),
}

#[derive(Debug, Clone, Parser, Default)]
pub struct ScanArgs {
    /// Resume an interrupted scan from its checkpoint
    #[arg(long, short)]
    pub resume: bool,

    /// Override the device size hint in bytes (0 = unknown)
    #[arg(long)]
    pub size_hint: Option<u64>,

    /// Save a scan checkpoint every N chunks (0 = disabled)
    #[arg(long)]
    pub checkpoint_interval: Option<u64>,
}

#[derive(Debug, Clone, Parser)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Parser)]
pub struct ExtractArgs {
    /// Titles to extract: indices like "1,3", or "all"
    pub titles: Vec<String>,

    /// Manual mode: extract from this byte offset, skipping the index
    #[arg(long)]
    pub offset: Option<u64>,

    /// ID used for the output filename in manual mode
    #[arg(long, default_value = "MANUAL")]
    pub id: String,

    /// Disc format assumed in manual mode
    #[arg(long, value_enum, default_value = "wii")]
    pub format: FormatArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human readable table
    Human,
    /// JSON output
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    /// Wii disc (4.38 GiB image)
    Wii,
    /// GameCube disc (1.36 GiB image)
    Gc,
}

impl From<FormatArg> for DiscFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Wii => DiscFormat::Wii,
            FormatArg::Gc => DiscFormat::GameCube,
        }
    }
}

/// A parsed title selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every title.
    All,
    /// Zero-based indices, in the order given.
    Indices(Vec<usize>),
    /// The operator asked to leave.
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("empty selection")]
    Empty,

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("{index} is out of range (1-{count})")]
    OutOfRange { index: usize, count: usize },
}

/// Parse a menu selection against a list of `count` titles.
///
/// Accepts `all`, `q`/`quit`, or a comma-separated list of 1-based indices.
pub fn parse_selection(input: &str, count: usize) -> Result<Selection, SelectionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SelectionError::Empty);
    }

    match input.to_ascii_lowercase().as_str() {
        "q" | "quit" => return Ok(Selection::Quit),
        "all" => return Ok(Selection::All),
        _ => {}
    }

    let mut indices = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let index: usize = token
            .parse()
            .map_err(|_| SelectionError::NotANumber(token.to_string()))?;
        if index == 0 || index > count {
            return Err(SelectionError::OutOfRange { index, count });
        }
        indices.push(index - 1);
    }

    if indices.is_empty() {
        return Err(SelectionError::Empty);
    }
    Ok(Selection::Indices(indices))
}
