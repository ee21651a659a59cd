//! Campus Scene - Viewer logic without a renderer
//!
//! This crate turns a campus manifest into the state a renderer needs:
//! - Asset sources (HTTP, directory, in-memory)
//! - Lazy floor loading with per-building floor cursors
//! - Pin markers with floor focus overrides
//! - Pointer picking with wall occlusion
//! - Camera framing targets
//! - The [`Viewer`] facade and the host command dispatcher

pub mod camera;
pub mod events;
pub mod floors;
pub mod loader;
pub mod picking;
pub mod pins;
pub mod rooms;
pub mod source;
pub mod viewer;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use camera::{CameraPose, CameraRig, CameraSettings};
pub use events::{FloorEvent, PinPayload, ViewerEvent};
pub use floors::{BuildingSummary, FloorStore, FloorSummary};
pub use loader::{load_manifest, AssetLoadError, FloorModel, LoadError};
pub use picking::{PointerEvent, Viewport};
pub use pins::{FloorFocus, Marker, MarkerStyle, PinColor, PinRegistry};
pub use rooms::RoomDirectory;
pub use source::{AssetSource, DirSource, HttpSource, MemorySource, SourceError};
pub use viewer::{Viewer, ViewerError, ViewerSettings};
pub use visibility::VisibilityState;
