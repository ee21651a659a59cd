//! campus-manifest - Generate the campus manifest from floor models
//!
//! Every subdirectory of the model root is a building; every `floorN.glb`
//! inside it is floor `N`. Bounding boxes and pins are read from the GLB JSON
//! chunk, so buffers are never decoded.

mod scan;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "campus-manifest")]
#[command(about = "Generate manifest.json from a directory of building floor models")]
#[command(version)]
struct Args {
    /// Model root holding one directory per building
    #[arg(short, long, default_value = "assets/models")]
    root: PathBuf,

    /// Output file (defaults to <root>/manifest.json)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
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

    let out = args.out.unwrap_or_else(|| args.root.join("manifest.json"));
    let manifest = scan::build_manifest(&args.root)?;

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&out, manifest.to_json_pretty()?)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    info!(
        buildings = manifest.buildings.len(),
        out = %out.display(),
        "Manifest written"
    );
    Ok(())
}
