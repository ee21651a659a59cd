//! Campus Daemon - Main entry point
//!
//! Loads the campus manifest, serves the models and the front end, and
//! drives the viewer from host commands over HTTP and WebSocket.

mod api;
mod config;
mod server;
mod state;
mod ws;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "campus")]
#[command(about = "Campus building viewer daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "campus.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Load the manifest, print the buildings, and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Campus v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    info!(
        model_root = %config.assets.model_root,
        manifest = %config.assets.manifest,
        "Configuration loaded"
    );

    // Create application state; a bad manifest stops here
    let state = state::AppState::new(config.clone()).await?;

    if args.check {
        let buildings = state.viewer.lock().await.store().buildings().await;
        println!("Manifest has {} buildings:", buildings.len());
        for building in buildings {
            let levels: Vec<String> = building.floors.iter().map(|f| f.level.to_string()).collect();
            println!(
                "  - {} ({}){}: floors [{}]",
                building.name,
                building.id,
                if building.hidden { " hidden" } else { "" },
                levels.join(", ")
            );
        }
    } else {
        server::run(state, &config.server.bind, config.server.tls.as_ref()).await?;
    }

    Ok(())
}
