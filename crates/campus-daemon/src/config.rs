//! Configuration loading

use anyhow::Result;
use campus_scene::{CameraPose, CameraSettings, MarkerStyle, ViewerSettings};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Static files for the front end
    #[serde(default = "default_web_root")]
    pub web_root: String,
    /// TLS configuration (optional - enables HTTPS when present)
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            web_root: default_web_root(),
            tls: None,
        }
    }
}

/// TLS/HTTPS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM format)
    pub cert: String,
    /// Path to private key file (PEM format)
    pub key: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_web_root() -> String {
    "web".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory (or URL path under `base_url`) holding the building folders
    #[serde(default = "default_model_root")]
    pub model_root: String,
    /// Manifest path relative to `model_root`
    #[serde(default = "default_manifest")]
    pub manifest: String,
    /// Room metadata file
    #[serde(default = "default_rooms")]
    pub rooms: String,
    /// Fetch assets over HTTP from this base instead of the filesystem
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            model_root: default_model_root(),
            manifest: default_manifest(),
            rooms: default_rooms(),
            base_url: None,
        }
    }
}

fn default_model_root() -> String {
    "assets/models".to_string()
}

fn default_manifest() -> String {
    "manifest.json".to_string()
}

fn default_rooms() -> String {
    "assets/rooms.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Vertical offset applied to every floor model
    #[serde(default = "default_floor_y_offset")]
    pub floor_y_offset: f32,
    #[serde(default = "default_tilt")]
    pub pin_focus_tilt_deg: f32,
    #[serde(default = "default_distance_factor")]
    pub pin_focus_distance_factor: f32,
    #[serde(default)]
    pub pin_focus_target_y_offset: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            floor_y_offset: default_floor_y_offset(),
            pin_focus_tilt_deg: default_tilt(),
            pin_focus_distance_factor: default_distance_factor(),
            pin_focus_target_y_offset: 0.0,
        }
    }
}

fn default_floor_y_offset() -> f32 {
    0.5
}

fn default_tilt() -> f32 {
    45.0
}

fn default_distance_factor() -> f32 {
    0.6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
    #[serde(default = "default_aspect")]
    pub aspect: f32,
    #[serde(default = "default_position")]
    pub position: [f32; 3],
    #[serde(default)]
    pub target: [f32; 3],
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "default_vertical_offset")]
    pub vertical_offset: f32,
    #[serde(default = "default_fit_padding")]
    pub fit_padding: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
            aspect: default_aspect(),
            position: default_position(),
            target: [0.0; 3],
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            vertical_offset: default_vertical_offset(),
            fit_padding: default_fit_padding(),
        }
    }
}

fn default_fov() -> f32 {
    75.0
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    1000.0
}

fn default_aspect() -> f32 {
    16.0 / 9.0
}

fn default_position() -> [f32; 3] {
    [30.0, 20.0, 30.0]
}

fn default_min_distance() -> f32 {
    30.0
}

fn default_max_distance() -> f32 {
    100.0
}

fn default_vertical_offset() -> f32 {
    -5.0
}

fn default_fit_padding() -> f32 {
    1.1
}

impl Config {
    /// Viewer settings derived from this config
    pub fn to_viewer_settings(&self) -> ViewerSettings {
        let camera = &self.camera;
        ViewerSettings {
            manifest_path: self.assets.manifest.clone(),
            floor_y_offset: self.viewer.floor_y_offset,
            marker: MarkerStyle::default(),
            camera: CameraSettings {
                fov_deg: camera.fov,
                aspect: camera.aspect,
                near: camera.near,
                far: camera.far,
                home: CameraPose {
                    position: Vec3::from_array(camera.position),
                    target: Vec3::from_array(camera.target),
                },
                min_distance: camera.min_distance,
                max_distance: camera.max_distance,
                vertical_offset: camera.vertical_offset,
                pin_focus_tilt_deg: self.viewer.pin_focus_tilt_deg,
                pin_focus_distance_factor: self.viewer.pin_focus_distance_factor,
                pin_focus_target_y_offset: self.viewer.pin_focus_target_y_offset,
                fit_padding: camera.fit_padding,
            },
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
