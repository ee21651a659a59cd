//! Application state management

use anyhow::{Context, Result};
use campus_scene::{AssetSource, DirSource, HttpSource, RoomDirectory, Viewer, ViewerEvent};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::info;

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// The viewer; one request at a time drives it
    pub viewer: Mutex<Viewer>,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Build the asset sources, then load the manifest
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let (models, rooms, rooms_path) = build_sources(&config)?;
        let directory = RoomDirectory::new(rooms, rooms_path);

        let mut viewer = Viewer::new(models, directory, config.to_viewer_settings());
        viewer
            .init()
            .await
            .context("Viewer initialization failed")?;

        Ok(Arc::new(Self {
            viewer: Mutex::new(viewer),
            config,
        }))
    }

    /// Subscribe to viewer events
    pub async fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.viewer.lock().await.subscribe()
    }
}

/// Model source, room source, and the room file path within it
type Sources = (Arc<dyn AssetSource>, Arc<dyn AssetSource>, String);

/// HTTP when a base URL is configured, files otherwise
fn build_sources(config: &Config) -> Result<Sources> {
    let assets = &config.assets;
    match &assets.base_url {
        Some(base) => {
            let base = base.trim_end_matches('/');
            info!(base = %base, "Fetching assets over HTTP");
            let models: Arc<dyn AssetSource> =
                Arc::new(HttpSource::new(format!("{}/{}", base, assets.model_root))?);
            let rooms: Arc<dyn AssetSource> = Arc::new(HttpSource::new(base)?);
            Ok((models, rooms, assets.rooms.clone()))
        }
        None => {
            info!(model_root = %assets.model_root, "Reading assets from disk");
            let rooms_path = Path::new(&assets.rooms);
            let rooms_dir = rooms_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let rooms_file = rooms_path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| assets.rooms.clone());
            let models: Arc<dyn AssetSource> = Arc::new(DirSource::new(&assets.model_root));
            let rooms: Arc<dyn AssetSource> = Arc::new(DirSource::new(rooms_dir));
            Ok((models, rooms, rooms_file))
        }
    }
}
