//! campus-rooms - Build the room popup database from the asset inventory
//!
//! Reads the first worksheet of the inventory export and writes
//! `{ "rooms": [...] }` for the viewer's room directory.

mod inventory;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use inventory::RoomEntry;

#[derive(Parser, Debug)]
#[command(name = "campus-rooms")]
#[command(about = "Convert the asset inventory spreadsheet into rooms.json")]
#[command(version)]
struct Args {
    /// Inventory spreadsheet (xlsx, xls or ods)
    #[arg(short, long)]
    input: PathBuf,

    /// Output JSON file
    #[arg(short, long)]
    output: PathBuf,

    /// Write compact JSON
    #[arg(long)]
    no_pretty: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Serialize)]
struct RoomsFile<'a> {
    rooms: &'a [RoomEntry],
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let rooms = inventory::convert(&args.input)?;

    let file = RoomsFile { rooms: &rooms };
    let mut json = if args.no_pretty {
        serde_json::to_string(&file)?
    } else {
        serde_json::to_string_pretty(&file)?
    };
    json.push('\n');

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(rooms = rooms.len(), out = %args.output.display(), "Room database written");
    Ok(())
}
