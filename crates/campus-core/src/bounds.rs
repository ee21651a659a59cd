//! Axis-aligned bounding boxes

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize, Serializer};

/// Axis-aligned bounding box in model or world space.
///
/// An empty box has `min > max` on every axis. On the wire a box is
/// `{ "min": [x, y, z], "max": [x, y, z] }`, and an empty box is written as
/// the zero box, which is how the manifest marks "no geometry".
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "RawAabb")]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

#[derive(Deserialize, Serialize)]
struct RawAabb {
    min: [f32; 3],
    max: [f32; 3],
}

impl From<RawAabb> for Aabb {
    fn from(raw: RawAabb) -> Self {
        Self::new(Vec3::from_array(raw.min), Vec3::from_array(raw.max))
    }
}

impl Serialize for Aabb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = if self.is_empty() {
            RawAabb {
                min: [0.0; 3],
                max: [0.0; 3],
            }
        } else {
            RawAabb {
                min: self.min.to_array(),
                max: self.max.to_array(),
            }
        };
        raw.serialize(serializer)
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub const ZERO: Aabb = Aabb {
        min: Vec3::ZERO,
        max: Vec3::ZERO,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Cube of the given half extent around a point
    pub fn around(center: Vec3, half_extent: f32) -> Self {
        Self::new(center - Vec3::splat(half_extent), center + Vec3::splat(half_extent))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// True for empty boxes and for the zero box written for missing geometry
    pub fn is_unknown(&self) -> bool {
        self.is_empty() || (self.min == Vec3::ZERO && self.max == Vec3::ZERO)
    }

    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn expand_box(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(self.min + offset, self.max + offset)
    }

    /// Box enclosing all eight corners after applying `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.expand_point(matrix.transform_point3(corner));
        }
        out
    }

    /// Distance along the ray to the first hit, using the slab method.
    ///
    /// `direction` does not need to be normalized; the returned value is in
    /// units of `direction`. A ray starting inside the box hits at 0.
    pub fn ray_distance(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let t1 = (self.min - origin) / direction;
        let t2 = (self.max - origin) / direction;
        let tmin = t1.min(t2);
        let tmax = t1.max(t2);
        let enter = tmin.x.max(tmin.y).max(tmin.z);
        let exit = tmax.x.min(tmax.y).min(tmax.z);
        if exit >= enter.max(0.0) {
            Some(enter.max(0.0))
        } else {
            None
        }
    }
}
