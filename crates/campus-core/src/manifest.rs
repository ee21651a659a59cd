//! Model manifest parsing and serialization
//!
//! The manifest describes every building, its floors (one GLB file each) and
//! the room pins placed on each floor:
//!
//! ```json
//! { "BlocoA": { "name": "Bloco A", "bbox": {"min": [..], "max": [..]},
//!               "floors": [ { "file": "floor0.glb", "name": "Térreo", "level": 0,
//!                             "bbox": {..}, "pins": [ {"id": "A101", "position": [1, 0, 2]} ] } ] } }
//! ```
//!
//! Building order is significant (the first building is shown at startup),
//! so the top-level object is read entry by entry instead of through a map.
//! Individual malformed pins are dropped rather than failing the document.

use glam::Vec3;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::bounds::Aabb;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A single interactive pin on a floor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinDescriptor {
    pub id: String,
    /// Position in the floor model's local space
    pub position: Vec3,
    /// Whether clicking the pin opens the room popup
    #[serde(rename = "opensPopup")]
    pub opens_popup: bool,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl PinDescriptor {
    /// Convert a raw JSON pin, returning `None` when it is malformed.
    ///
    /// A pin needs a non-empty id and a position of exactly three numbers.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let id = match obj.get("id")? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        let position = obj.get("position")?.as_array()?;
        if position.len() != 3 {
            return None;
        }
        let mut coords = [0.0f32; 3];
        for (slot, component) in coords.iter_mut().zip(position) {
            *slot = component.as_f64()? as f32;
        }

        let opens_popup = obj.get("opensPopup").and_then(Value::as_bool).unwrap_or(true);
        let display_name = obj
            .get("displayName")
            .or_else(|| obj.get("label"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            id,
            position: Vec3::from_array(coords),
            opens_popup,
            display_name,
        })
    }

    /// Label shown next to the pin
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// A floor of a building, backed by one GLB file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorDescriptor {
    /// GLB file name, relative to the building directory
    pub file: String,
    pub name: String,
    /// Ordering key; levels need not be contiguous
    pub level: i32,
    pub bbox: Aabb,
    pub pins: Vec<PinDescriptor>,
}

#[derive(Deserialize)]
struct RawFloor {
    file: String,
    #[serde(default)]
    name: Option<String>,
    level: i32,
    #[serde(default)]
    bbox: Option<Aabb>,
    #[serde(default)]
    pins: Option<Value>,
}

impl From<RawFloor> for FloorDescriptor {
    fn from(raw: RawFloor) -> Self {
        let pins = match raw.pins {
            Some(Value::Array(items)) => {
                let total = items.len();
                let pins: Vec<PinDescriptor> =
                    items.iter().filter_map(PinDescriptor::from_value).collect();
                if pins.len() != total {
                    debug!(
                        file = %raw.file,
                        dropped = total - pins.len(),
                        "Dropped malformed pins"
                    );
                }
                pins
            }
            _ => Vec::new(),
        };

        Self {
            name: raw.name.unwrap_or_else(|| floor_display_name(raw.level)),
            file: raw.file,
            level: raw.level,
            bbox: raw.bbox.unwrap_or(Aabb::ZERO),
            pins,
        }
    }
}

/// A building: display metadata plus its floors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingDescriptor {
    /// Manifest key
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub bbox: Aabb,
    pub floors: Vec<FloorDescriptor>,
    /// Directory holding the floor files when it differs from the id
    #[serde(rename = "sourceDir", skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    /// Hidden buildings are loaded but not offered as toggles
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
}

#[derive(Deserialize)]
struct RawBuilding {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bbox: Option<Aabb>,
    floors: Vec<RawFloor>,
    #[serde(default, rename = "sourceDir")]
    source_dir: Option<String>,
    #[serde(default)]
    hidden: bool,
}

impl BuildingDescriptor {
    /// Directory of the floor files relative to the model root
    pub fn directory(&self) -> &str {
        self.source_dir.as_deref().unwrap_or(&self.id)
    }

    /// Highest floor level, if the building has floors
    pub fn max_level(&self) -> Option<i32> {
        self.floors.iter().map(|f| f.level).max()
    }
}

/// The parsed manifest, buildings in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub buildings: Vec<BuildingDescriptor>,
}

impl Manifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn building(&self, id: &str) -> Option<&BuildingDescriptor> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn first_building(&self) -> Option<&BuildingDescriptor> {
        self.buildings.first()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buildings.len()))?;
        for building in &self.buildings {
            map.serialize_entry(&building.id, building)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ManifestVisitor;

        impl<'de> Visitor<'de> for ManifestVisitor {
            type Value = Manifest;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping building ids to buildings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Manifest, A::Error> {
                let mut buildings: Vec<BuildingDescriptor> = Vec::new();
                while let Some((id, raw)) = access.next_entry::<String, RawBuilding>()? {
                    if buildings.iter().any(|b| b.id == id) {
                        return Err(de::Error::custom(format!("duplicate building id {id}")));
                    }
                    buildings.push(BuildingDescriptor {
                        name: raw.name.unwrap_or_else(|| id.clone()),
                        bbox: raw.bbox.unwrap_or(Aabb::ZERO),
                        floors: raw.floors.into_iter().map(FloorDescriptor::from).collect(),
                        source_dir: raw.source_dir,
                        hidden: raw.hidden,
                        id,
                    });
                }
                Ok(Manifest { buildings })
            }
        }

        deserializer.deserialize_map(ManifestVisitor)
    }
}

/// Default display name for a floor level
pub fn floor_display_name(level: i32) -> String {
    if level == 0 {
        "Térreo".to_string()
    } else {
        format!("{}º Pavimento", level)
    }
}
