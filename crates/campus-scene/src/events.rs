//! Events flowing out of the floor store and the viewer

use campus_core::RoomSummary;
use glam::Vec3;
use serde::Serialize;
use std::sync::Arc;

use crate::camera::CameraPose;
use crate::loader::FloorModel;

/// One pin handed to the registry when its floor first loads
#[derive(Debug, Clone)]
pub struct PinPayload {
    pub id: String,
    /// Position in the floor model's local space
    pub position: Vec3,
    pub building: String,
    pub floor_level: i32,
    /// The floor model the pin is attached to
    pub parent: Arc<FloorModel>,
    pub display_name: String,
    pub opens_popup: bool,
    /// Effective visibility of the parent floor at emit time
    pub parent_visible: bool,
}

/// Store notifications consumed by the pin registry.
///
/// `PinsLoaded` is sent at most once per floor entry. `VisibilityChanged` is
/// sent once per entry on every visibility pass.
#[derive(Debug, Clone)]
pub enum FloorEvent {
    PinsLoaded(Vec<PinPayload>),
    VisibilityChanged {
        building: String,
        level: i32,
        visible: bool,
    },
}

/// Viewer notifications for hosts (WebSocket clients)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ViewerEvent {
    FloorVisibility {
        building: String,
        level: i32,
        visible: bool,
    },
    PinsAdded {
        building: String,
        level: i32,
        count: usize,
    },
    PinClicked {
        pin_id: String,
        building: String,
        level: i32,
        opens_popup: bool,
    },
    PopupOpened(RoomSummary),
    PopupClosed {
        pin_id: String,
    },
    CameraMoved(CameraPose),
    PinColorChanged {
        pin_id: String,
        color: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = ViewerEvent::FloorVisibility {
            building: "A".to_string(),
            level: 1,
            visible: true,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "floor_visibility");
        assert_eq!(value["data"]["building"], "A");
        assert_eq!(value["data"]["visible"], true);

        let event = ViewerEvent::CameraMoved(CameraPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            target: Vec3::ZERO,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "camera_moved");
        assert_eq!(value["data"]["position"], serde_json::json!([1.0, 2.0, 3.0]));
    }
}
