//! Campus Core - Core types, manifest parsing, and GLB scanning
//!
//! This crate provides the foundational types for the campus viewer:
//! - Manifest parsing with tolerant pin handling
//! - Axis-aligned bounding boxes and ray tests
//! - GLB container reading and scene scanning (bounds + pin nodes)
//! - Room metadata records for pin popups
//! - Host command protocol messages

pub mod bounds;
pub mod command;
pub mod glb;
pub mod manifest;
pub mod rooms;

pub use bounds::Aabb;
pub use command::{CommandError, CommandReply, FocusOptions, HostCommand};
pub use glb::{GlbError, SceneScan, ScannedMesh, ScannedPin};
pub use manifest::{
    BuildingDescriptor, FloorDescriptor, Manifest, ManifestError, PinDescriptor,
};
pub use rooms::{RoomDatabase, RoomRecord, RoomSummary};
