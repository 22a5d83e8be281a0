//! wode-carver - recover Wii and GameCube disc images from raw WODE dumps.
//!
//! Scans a raw device or dump file for embedded disc images, caches the
//! discoveries in an index, and extracts selected titles to .iso files.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wode_carver::cli::{commands, interactive, Cli, Commands};
use wode_carver::config::UserConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let user = UserConfig::load();

    // Initialize logging
    let level = if cli.verbose {
        "debug"
    } else {
        user.log_level.as_str()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).compact())
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("wode_carver={level}").parse()?),
        )
        .init();

    match &cli.command {
        Some(Commands::Scan(args)) => commands::run_scan(&cli, args, &user)?,
        Some(Commands::List(args)) => commands::run_list(&cli, args, &user)?,
        Some(Commands::Extract(args)) => commands::run_extract(&cli, args, &user)?,
        None => {
            // Default: the interactive scan/select/extract session
            interactive::run_session(&cli, &user)?;
        }
    }

    Ok(())
}
