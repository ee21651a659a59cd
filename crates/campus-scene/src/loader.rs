//! Manifest and floor model loading

use campus_core::{Aabb, GlbError, Manifest, SceneScan};
use glam::Vec3;
use thiserror::Error;
use tracing::{debug, info};

use crate::source::{AssetSource, SourceError};

/// Fatal manifest load failure
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to fetch {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: SourceError,
    },
    #[error("Failed to parse {location}: {message}")]
    Parse { location: String, message: String },
}

/// Floor geometry failure; logged, never fatal
#[derive(Error, Debug)]
pub enum AssetLoadError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] SourceError),
    #[error("Decode failed: {0}")]
    Decode(#[from] GlbError),
}

/// Fetch and parse the manifest.
pub async fn load_manifest(source: &dyn AssetSource, path: &str) -> Result<Manifest, LoadError> {
    let location = source.locate(path);
    let bytes = source.fetch(path).await.map_err(|e| LoadError::Fetch {
        location: location.clone(),
        source: e,
    })?;

    let manifest = Manifest::from_slice(&bytes).map_err(|e| LoadError::Parse {
        location: location.clone(),
        message: e.to_string(),
    })?;

    info!(
        location = %location,
        buildings = manifest.buildings.len(),
        "Loaded manifest"
    );
    Ok(manifest)
}

/// A loaded floor: the scanned scene plus the placement offset
#[derive(Debug, Clone)]
pub struct FloorModel {
    pub path: String,
    pub offset: Vec3,
    pub scan: SceneScan,
}

impl FloorModel {
    /// Scene-local point to world space
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        local + self.offset
    }

    /// World-space bounds of the geometry
    pub fn world_bounds(&self) -> Aabb {
        self.scan.bounds.translated(self.offset)
    }

    /// World-space boxes of every mesh, used as pick blockers
    pub fn world_meshes(&self) -> impl Iterator<Item = Aabb> + '_ {
        self.scan
            .meshes
            .iter()
            .map(move |m| m.bounds.translated(self.offset))
    }
}

/// Fetch a floor model and scan it
pub async fn load_floor_model(
    source: &dyn AssetSource,
    path: &str,
    y_offset: f32,
) -> Result<FloorModel, AssetLoadError> {
    let bytes = source.fetch(path).await?;
    let scan = SceneScan::from_bytes(&bytes)?;
    debug!(
        path = %path,
        meshes = scan.meshes.len(),
        pins = scan.pins.len(),
        "Scanned floor model"
    );
    Ok(FloorModel {
        path: path.to_string(),
        offset: Vec3::new(0.0, y_offset, 0.0),
        scan,
    })
}
