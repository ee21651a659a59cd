//! Camera framing
//!
//! Computes target poses only; easing toward them is up to the renderer.

use campus_core::Aabb;
use glam::{Mat4, Vec2, Vec3};
use serde::Serialize;
use tracing::warn;

use crate::picking::Ray;

/// Camera position plus orbit target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraPose {
    pub fn offset(&self) -> Vec3 {
        self.position - self.target
    }

    pub fn distance(&self) -> f32 {
        self.offset().length()
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub home: CameraPose,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Added to the target height when framing boxes
    pub vertical_offset: f32,
    /// Angle from vertical when focusing a pin
    pub pin_focus_tilt_deg: f32,
    pub pin_focus_distance_factor: f32,
    pub pin_focus_target_y_offset: f32,
    pub fit_padding: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            home: CameraPose {
                position: Vec3::new(30.0, 20.0, 30.0),
                target: Vec3::ZERO,
            },
            min_distance: 30.0,
            max_distance: 100.0,
            vertical_offset: -5.0,
            pin_focus_tilt_deg: 45.0,
            pin_focus_distance_factor: 0.6,
            pin_focus_target_y_offset: 0.0,
            fit_padding: 1.1,
        }
    }
}

/// Current camera pose plus a saved pose for popup round trips
#[derive(Debug, Clone)]
pub struct CameraRig {
    settings: CameraSettings,
    pose: CameraPose,
    saved: Option<CameraPose>,
}

impl CameraRig {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            pose: settings.home,
            settings,
            saved: None,
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    pub fn set_pose(&mut self, pose: CameraPose) {
        self.pose = pose;
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.settings.aspect = aspect;
        }
    }

    pub fn default_pose(&self) -> CameraPose {
        self.settings.home
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.settings.fov_deg.to_radians(),
            self.settings.aspect,
            self.settings.near,
            self.settings.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.pose.view()
    }

    /// World ray through a point in normalized device coordinates
    pub fn ray_through(&self, ndc: Vec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray {
            origin: self.pose.position,
            direction: (far - near).normalize_or_zero(),
        }
    }

    pub fn save(&mut self) {
        self.saved = Some(self.pose);
    }

    pub fn has_saved(&self) -> bool {
        self.saved.is_some()
    }

    /// Return to the saved pose, consuming it
    pub fn restore(&mut self) -> Option<CameraPose> {
        let saved = self.saved.take()?;
        self.pose = saved;
        Some(saved)
    }

    pub fn clear_saved(&mut self) {
        self.saved = None;
    }

    /// Back to the home pose; forgets any saved pose
    pub fn reset(&mut self) -> CameraPose {
        self.saved = None;
        self.pose = self.settings.home;
        self.pose
    }

    /// Orbit toward a pin: keep the azimuth, set the tilt, move closer
    pub fn focus_on_pin(&mut self, pin: Vec3) -> CameraPose {
        let s = &self.settings;
        let offset = self.pose.offset();
        let radius = (offset.length() * s.pin_focus_distance_factor).max(s.min_distance);
        let theta = offset.x.atan2(offset.z);
        let phi = s
            .pin_focus_tilt_deg
            .clamp(0.0, 89.9)
            .to_radians()
            .max(f32::EPSILON);

        let new_offset = Vec3::new(
            radius * phi.sin() * theta.sin(),
            radius * phi.cos(),
            radius * phi.sin() * theta.cos(),
        );
        let target = pin + Vec3::new(0.0, s.pin_focus_target_y_offset, 0.0);
        self.pose = CameraPose {
            position: target + new_offset,
            target,
        };
        self.pose
    }

    /// Recenter on a box, keeping the current angle and distance
    pub fn focus_on_box_at_current_distance(&mut self, bounds: &Aabb) -> Option<CameraPose> {
        if bounds.is_empty() {
            warn!("Nothing to focus on");
            return None;
        }
        let target = bounds.center() + Vec3::new(0.0, self.settings.vertical_offset, 0.0);
        self.pose = CameraPose {
            position: target + self.pose.offset(),
            target,
        };
        Some(self.pose)
    }

    /// Frame a box along the current view direction
    pub fn fit_to_box(&mut self, bounds: &Aabb) -> Option<CameraPose> {
        if bounds.is_empty() {
            warn!("Cannot fit camera to an empty box");
            return None;
        }
        let s = &self.settings;
        let target = bounds.center() + Vec3::new(0.0, s.vertical_offset, 0.0);
        let size = bounds.size();
        let direction = self.pose.offset().try_normalize().unwrap_or(Vec3::Z);

        let fov = s.fov_deg.to_radians();
        let horizontal_fov = 2.0 * ((fov / 2.0).tan() * s.aspect).atan();
        let fit_height = size.y / (2.0 * (fov / 2.0).tan());
        let fit_width = size.x / (2.0 * (horizontal_fov / 2.0).tan());
        let distance = s.fit_padding * fit_height.max(fit_width).max(size.z);

        self.pose = CameraPose {
            position: target + direction * distance,
            target,
        };
        Some(self.pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_focus_on_pin_keeps_azimuth_and_sets_tilt() {
        let mut rig = CameraRig::new(CameraSettings::default());
        let before = rig.pose().offset();
        let pin = Vec3::new(5.0, 1.0, -3.0);

        let pose = rig.focus_on_pin(pin);
        assert_eq!(pose.target, pin);

        let offset = pose.offset();
        // 0.6 * |(30, 20, 30)| is about 28, below the minimum distance
        assert!(approx(offset.length(), 30.0));
        assert!(approx(offset.x.atan2(offset.z), before.x.atan2(before.z)));
        let tilt = (offset.y / offset.length()).acos().to_degrees();
        assert!(approx(tilt, 45.0));
    }

    #[test]
    fn test_focus_on_pin_from_far_away() {
        let mut rig = CameraRig::new(CameraSettings::default());
        rig.set_pose(CameraPose {
            position: Vec3::new(0.0, 0.0, 100.0),
            target: Vec3::ZERO,
        });
        let pose = rig.focus_on_pin(Vec3::ZERO);
        assert!(approx(pose.distance(), 60.0));
    }

    #[test]
    fn test_focus_on_box_keeps_offset() {
        let mut rig = CameraRig::new(CameraSettings::default());
        let before = rig.pose().offset();
        let bounds = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 4.0, 10.0));

        let pose = rig.focus_on_box_at_current_distance(&bounds).unwrap();
        assert_eq!(pose.target, Vec3::new(5.0, -3.0, 5.0));
        assert_eq!(pose.offset(), before);
        assert!(rig.focus_on_box_at_current_distance(&Aabb::EMPTY).is_none());
    }

    #[test]
    fn test_fit_to_box() {
        let mut rig = CameraRig::new(CameraSettings::default());
        let direction = rig.pose().offset().normalize();
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(10.0, 10.0, 80.0));

        let pose = rig.fit_to_box(&bounds).unwrap();
        // Depth dominates here
        assert!(approx(pose.distance(), 88.0));
        assert!((pose.offset().normalize() - direction).length() < 1e-4);
        assert!(rig.fit_to_box(&Aabb::EMPTY).is_none());
    }

    #[test]
    fn test_save_restore_reset() {
        let mut rig = CameraRig::new(CameraSettings::default());
        rig.save();
        rig.focus_on_pin(Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(rig.restore(), Some(CameraSettings::default().home));
        assert_eq!(rig.restore(), None);

        rig.focus_on_pin(Vec3::ONE);
        rig.save();
        assert_eq!(rig.reset(), rig.default_pose());
        assert!(!rig.has_saved());
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let rig = CameraRig::new(CameraSettings::default());
        let ray = rig.ray_through(Vec2::ZERO);
        let expected = (rig.pose().target - rig.pose().position).normalize();
        assert!((ray.direction - expected).length() < 1e-4);
    }
}
