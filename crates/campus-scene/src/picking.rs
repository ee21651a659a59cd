//! Pointer picking with wall occlusion
//!
//! Pins and blockers are tested as boxes. A blocker only counts when it is
//! hit strictly before the nearest pin and does not contain that pin, so a
//! coarse room box around the pin never swallows the click.
//!
//! The flip side: a floor exported as one merged mesh has a single box that
//! usually contains its pins, so walls inside that mesh never block a click.
//! Only geometry exported as separate meshes occludes.

use campus_core::Aabb;
use glam::{Vec2, Vec3};
use serde::Deserialize;

use crate::pins::Marker;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

/// Canvas rectangle in client pixels
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    #[serde(default)]
    pub left: f32,
    #[serde(default)]
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Pointer position in client pixels
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Client pixels to normalized device coordinates
    pub fn to_ndc(&self, pointer: PointerEvent) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let x = (pointer.x - self.left) / self.width;
        let y = (pointer.y - self.top) / self.height;
        Some(Vec2::new(x * 2.0 - 1.0, -(y * 2.0) + 1.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickResult {
    /// Identifies the exact marker hit; ids may repeat across floors
    Pin {
        building: String,
        level: i32,
        id: String,
        distance: f32,
    },
    Occluded { id: String, blocker_distance: f32 },
    Miss,
}

/// Cast `ray` against candidate markers, then check for closer blockers
pub fn pick<'a>(
    ray: &Ray,
    markers: impl IntoIterator<Item = &'a Marker>,
    blockers: &[Aabb],
) -> PickResult {
    let nearest = markers
        .into_iter()
        .filter_map(|m| {
            m.hit_box()
                .ray_distance(ray.origin, ray.direction)
                .map(|d| (m, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let Some((marker, distance)) = nearest else {
        return PickResult::Miss;
    };
    let hit_point = ray.origin + ray.direction * distance;

    let blocker = blockers
        .iter()
        .filter(|b| !contains(b, hit_point) && !contains(b, marker.position))
        .filter_map(|b| b.ray_distance(ray.origin, ray.direction))
        .filter(|&d| d < distance)
        .min_by(f32::total_cmp);

    match blocker {
        Some(blocker_distance) => PickResult::Occluded {
            id: marker.id.clone(),
            blocker_distance,
        },
        None => PickResult::Pin {
            building: marker.building.clone(),
            level: marker.level,
            id: marker.id.clone(),
            distance,
        },
    }
}

fn contains(bounds: &Aabb, point: Vec3) -> bool {
    point.cmpge(bounds.min).all() && point.cmple(bounds.max).all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PinPayload;
    use crate::loader::FloorModel;
    use crate::pins::{MarkerStyle, PinRegistry};
    use campus_core::SceneScan;
    use std::sync::Arc;

    fn registry_with(pins: &[(&str, Vec3, bool)]) -> PinRegistry {
        let parent = Arc::new(FloorModel {
            path: "B/floor0.glb".to_string(),
            offset: Vec3::ZERO,
            scan: SceneScan::default(),
        });
        let mut registry = PinRegistry::new(MarkerStyle::default());
        registry.add_pins(
            pins.iter()
                .map(|(id, position, opens_popup)| PinPayload {
                    id: id.to_string(),
                    position: *position,
                    building: "B".to_string(),
                    floor_level: 0,
                    parent: parent.clone(),
                    display_name: id.to_string(),
                    opens_popup: *opens_popup,
                    parent_visible: true,
                })
                .collect(),
        );
        registry
    }

    fn ray_at(registry: &PinRegistry, id: &str, from_x: f32) -> Ray {
        let target = registry.marker(id).unwrap().position;
        let origin = Vec3::new(from_x, target.y, target.z);
        Ray {
            origin,
            direction: (target - origin).normalize(),
        }
    }

    #[test]
    fn test_to_ndc() {
        let viewport = Viewport {
            left: 10.0,
            top: 20.0,
            width: 200.0,
            height: 100.0,
        };
        assert_eq!(viewport.to_ndc(PointerEvent { x: 110.0, y: 70.0 }), Some(Vec2::ZERO));
        assert_eq!(
            viewport.to_ndc(PointerEvent { x: 10.0, y: 20.0 }),
            Some(Vec2::new(-1.0, 1.0))
        );
        let empty = Viewport { width: 0.0, ..viewport };
        assert_eq!(empty.to_ndc(PointerEvent { x: 0.0, y: 0.0 }), None);
    }

    #[test]
    fn test_pick_nearest_pin() {
        let registry = registry_with(&[
            ("Near", Vec3::new(5.0, 0.0, 0.0), true),
            ("Far", Vec3::new(10.0, 0.0, 0.0), true),
        ]);
        let ray = ray_at(&registry, "Far", 0.0);
        match pick(&ray, registry.pickable_markers(), &[]) {
            PickResult::Pin { id, .. } => assert_eq!(id, "Near"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_silent_pins_are_never_hit() {
        let registry = registry_with(&[("Hall", Vec3::new(5.0, 0.0, 0.0), false)]);
        let ray = ray_at(&registry, "Hall", 0.0);
        assert_eq!(pick(&ray, registry.pickable_markers(), &[]), PickResult::Miss);
    }

    #[test]
    fn test_wall_between_camera_and_pin_blocks_click() {
        let registry = registry_with(&[("B001", Vec3::new(10.0, 0.0, 0.0), true)]);
        let ray = ray_at(&registry, "B001", 0.0);
        let wall = Aabb::new(Vec3::new(4.9, -10.0, -10.0), Vec3::new(5.1, 10.0, 10.0));

        assert!(matches!(
            pick(&ray, registry.pickable_markers(), &[wall]),
            PickResult::Occluded { .. }
        ));

        // Wall behind the pin does not block
        let behind = Aabb::new(Vec3::new(14.9, -10.0, -10.0), Vec3::new(15.1, 10.0, 10.0));
        assert!(matches!(
            pick(&ray, registry.pickable_markers(), &[behind]),
            PickResult::Pin { .. }
        ));

        // A room box enclosing the pin does not block it either
        let room = Aabb::new(Vec3::new(6.0, -10.0, -10.0), Vec3::new(14.0, 10.0, 10.0));
        assert!(matches!(
            pick(&ray, registry.pickable_markers(), &[room]),
            PickResult::Pin { .. }
        ));
    }

    #[test]
    fn test_hit_reports_building_and_level() {
        let registry = registry_with(&[("101", Vec3::new(5.0, 0.0, 0.0), true)]);
        let ray = ray_at(&registry, "101", 0.0);
        match pick(&ray, registry.pickable_markers(), &[]) {
            PickResult::Pin {
                building, level, id, ..
            } => assert_eq!((building.as_str(), level, id.as_str()), ("B", 0, "101")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_merged_floor_mesh_does_not_occlude() {
        let registry = registry_with(&[("B001", Vec3::new(10.0, 0.0, 0.0), true)]);
        let ray = ray_at(&registry, "B001", 0.0);

        // Slab and a wall at x = 5 merged into one mesh spanning the pin
        let merged = Aabb::new(Vec3::new(2.0, -1.0, -10.0), Vec3::new(20.0, 3.0, 10.0));
        assert!(matches!(
            pick(&ray, registry.pickable_markers(), &[merged]),
            PickResult::Pin { .. }
        ));

        // The same wall as its own mesh blocks
        let wall = Aabb::new(Vec3::new(4.9, -1.0, -10.0), Vec3::new(5.1, 3.0, 10.0));
        assert!(matches!(
            pick(&ray, registry.pickable_markers(), &[merged, wall]),
            PickResult::Occluded { .. }
        ));
    }
}
