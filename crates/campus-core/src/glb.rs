//! GLB container reading and scene scanning
//!
//! Only the JSON chunk of a GLB is read; vertex buffers are never decoded
//! (they may be Draco-compressed). Everything the viewer needs is in the
//! JSON: the node hierarchy, node names, and the min/max of every POSITION
//! accessor.
//!
//! Pins are authored as empty nodes named `Pin_<id>` (opens the room popup)
//! or `Pin#_<id>` (silent, informational only).

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bounds::Aabb;

/// `glTF` in little-endian
pub const GLB_MAGIC: u32 = 0x4654_6C67;
/// `JSON` chunk type
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
/// `BIN\0` chunk type
pub const CHUNK_BIN: u32 = 0x004E_4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum GlbError {
    #[error("File too short for a GLB header ({0} bytes)")]
    TooShort(usize),
    #[error("Not a valid GLB file (magic {0:#010x})")]
    BadMagic(u32),
    #[error("Chunk at offset {0} runs past the end of the file")]
    Truncated(usize),
    #[error("No JSON chunk found in GLB")]
    MissingJson,
    #[error("Invalid glTF JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Check for the GLB magic number
pub fn is_glb(bytes: &[u8]) -> bool {
    read_u32(bytes, 0) == Some(GLB_MAGIC)
}

/// Return the raw JSON chunk of a GLB container
pub fn json_chunk(bytes: &[u8]) -> Result<&[u8], GlbError> {
    if bytes.len() < HEADER_LEN {
        return Err(GlbError::TooShort(bytes.len()));
    }
    let magic = read_u32(bytes, 0).ok_or(GlbError::TooShort(bytes.len()))?;
    if magic != GLB_MAGIC {
        return Err(GlbError::BadMagic(magic));
    }

    let declared = read_u32(bytes, 8).ok_or(GlbError::TooShort(bytes.len()))? as usize;
    let length = declared.min(bytes.len());
    let mut offset = HEADER_LEN;

    while offset + CHUNK_HEADER_LEN <= length {
        let chunk_len = read_u32(bytes, offset).ok_or(GlbError::Truncated(offset))? as usize;
        let chunk_type = read_u32(bytes, offset + 4).ok_or(GlbError::Truncated(offset))?;
        let start = offset + CHUNK_HEADER_LEN;
        let end = start
            .checked_add(chunk_len)
            .filter(|end| *end <= bytes.len())
            .ok_or(GlbError::Truncated(offset))?;

        if chunk_type == CHUNK_JSON {
            return Ok(&bytes[start..end]);
        }
        offset = end;
    }

    Err(GlbError::MissingJson)
}

/// Build a GLB container holding only a JSON chunk
pub fn write_json_glb(json: &serde_json::Value) -> Vec<u8> {
    let mut chunk = json.to_string().into_bytes();
    while chunk.len() % 4 != 0 {
        chunk.push(b' ');
    }
    let total = HEADER_LEN + CHUNK_HEADER_LEN + chunk.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&chunk);
    out
}

/// The subset of the glTF document the scanner reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GltfDocument {
    #[serde(default)]
    pub scene: Option<usize>,
    #[serde(default)]
    pub scenes: Vec<GltfScene>,
    #[serde(default)]
    pub nodes: Vec<GltfNode>,
    #[serde(default)]
    pub meshes: Vec<GltfMesh>,
    #[serde(default)]
    pub accessors: Vec<GltfAccessor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GltfScene {
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GltfNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub children: Vec<usize>,
    #[serde(default)]
    pub mesh: Option<usize>,
    #[serde(default)]
    pub matrix: Option<[f32; 16]>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// Quaternion as (x, y, z, w)
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
}

impl GltfNode {
    /// Local transform: `matrix` when present, otherwise T * R * S
    pub fn local_matrix(&self) -> Mat4 {
        if let Some(m) = self.matrix {
            return Mat4::from_cols_array(&m);
        }
        let translation = self.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO);
        let rotation = self
            .rotation
            .map(|r| Quat::from_xyzw(r[0], r[1], r[2], r[3]).normalize())
            .unwrap_or(Quat::IDENTITY);
        let scale = self.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE);
        Mat4::from_scale_rotation_translation(scale, rotation, translation)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GltfMesh {
    #[serde(default)]
    pub primitives: Vec<GltfPrimitive>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GltfPrimitive {
    #[serde(default)]
    pub attributes: GltfAttributes,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GltfAttributes {
    #[serde(rename = "POSITION", default)]
    pub position: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GltfAccessor {
    #[serde(default)]
    pub min: Option<Vec<f32>>,
    #[serde(default)]
    pub max: Option<Vec<f32>>,
}

impl GltfAccessor {
    fn bounds(&self) -> Option<Aabb> {
        let min = self.min.as_ref().filter(|v| v.len() >= 3)?;
        let max = self.max.as_ref().filter(|v| v.len() >= 3)?;
        Some(Aabb::new(
            Vec3::new(min[0], min[1], min[2]),
            Vec3::new(max[0], max[1], max[2]),
        ))
    }
}

/// A pin node found in the scene
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannedPin {
    pub id: String,
    /// World position relative to the scene root
    pub position: Vec3,
    pub opens_popup: bool,
}

/// World-space box of one mesh node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannedMesh {
    pub name: Option<String>,
    pub bounds: Aabb,
}

/// Everything the viewer extracts from a floor model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SceneScan {
    /// Union of all mesh boxes; empty when the scene has no geometry
    pub bounds: Aabb,
    pub pins: Vec<ScannedPin>,
    pub meshes: Vec<ScannedMesh>,
}

/// Parse a pin node name: `Pin_<id>` or `Pin#_<id>`
pub fn parse_pin_name(name: &str) -> Option<(String, bool)> {
    let rest = name.strip_prefix("Pin")?;
    let (silent, rest) = match rest.strip_prefix('#') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let id = rest.strip_prefix('_')?.trim();
    if id.is_empty() {
        return None;
    }
    Some((id.to_string(), !silent))
}

impl SceneScan {
    /// Scan a GLB container
    pub fn from_glb(bytes: &[u8]) -> Result<Self, GlbError> {
        let document: GltfDocument = serde_json::from_slice(json_chunk(bytes)?)?;
        Ok(Self::from_document(&document))
    }

    /// Scan either a GLB container or a plain `.gltf` JSON document
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GlbError> {
        if is_glb(bytes) {
            Self::from_glb(bytes)
        } else {
            let document: GltfDocument = serde_json::from_slice(bytes)?;
            Ok(Self::from_document(&document))
        }
    }

    pub fn from_document(document: &GltfDocument) -> Self {
        let mut scan = SceneScan {
            bounds: Aabb::EMPTY,
            ..Default::default()
        };
        let Some(scene) = document.scenes.get(document.scene.unwrap_or(0)) else {
            return scan;
        };

        let mut visited = vec![false; document.nodes.len()];
        for &root in &scene.nodes {
            scan.visit(document, root, Mat4::IDENTITY, &mut visited);
        }
        scan
    }

    fn visit(&mut self, document: &GltfDocument, index: usize, parent: Mat4, visited: &mut [bool]) {
        let Some(node) = document.nodes.get(index) else {
            return;
        };
        if visited[index] {
            return;
        }
        visited[index] = true;

        let world = parent * node.local_matrix();

        if let Some((id, opens_popup)) = node.name.as_deref().and_then(parse_pin_name) {
            self.pins.push(ScannedPin {
                id,
                position: world.transform_point3(Vec3::ZERO),
                opens_popup,
            });
        }

        if let Some(mesh) = node.mesh.and_then(|m| document.meshes.get(m)) {
            let mut mesh_bounds = Aabb::EMPTY;
            for primitive in &mesh.primitives {
                let local = primitive
                    .attributes
                    .position
                    .and_then(|a| document.accessors.get(a))
                    .and_then(GltfAccessor::bounds);
                if let Some(local) = local {
                    mesh_bounds.expand_box(&local.transformed(&world));
                }
            }
            if !mesh_bounds.is_empty() {
                self.bounds.expand_box(&mesh_bounds);
                self.meshes.push(ScannedMesh {
                    name: node.name.clone(),
                    bounds: mesh_bounds,
                });
            }
        }

        for &child in &node.children {
            self.visit(document, child, world, visited);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> serde_json::Value {
        json!({
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [
                {"name": "Root", "translation": [10.0, 0.0, 0.0], "children": [1, 2, 3]},
                {"name": "Walls", "mesh": 0},
                {"name": "Pin_A101", "translation": [1.0, 2.0, 3.0]},
                {"name": "Pin#_Corredor", "translation": [0.0, 0.0, -1.0], "scale": [2.0, 2.0, 2.0]}
            ],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "accessors": [{"min": [-1.0, 0.0, -1.0], "max": [1.0, 3.0, 1.0]}]
        })
    }

    #[test]
    fn test_scan_glb() {
        let bytes = write_json_glb(&sample_document());
        assert!(is_glb(&bytes));

        let scan = SceneScan::from_glb(&bytes).unwrap();
        assert_eq!(scan.bounds, Aabb::new(Vec3::new(9.0, 0.0, -1.0), Vec3::new(11.0, 3.0, 1.0)));
        assert_eq!(scan.meshes.len(), 1);
        assert_eq!(scan.meshes[0].name.as_deref(), Some("Walls"));

        assert_eq!(scan.pins.len(), 2);
        assert_eq!(scan.pins[0].id, "A101");
        assert_eq!(scan.pins[0].position, Vec3::new(11.0, 2.0, 3.0));
        assert!(scan.pins[0].opens_popup);
        assert_eq!(scan.pins[1].id, "Corredor");
        assert!(!scan.pins[1].opens_popup);
    }

    #[test]
    fn test_plain_gltf_json() {
        let bytes = serde_json::to_vec(&sample_document()).unwrap();
        let scan = SceneScan::from_bytes(&bytes).unwrap();
        assert_eq!(scan.pins.len(), 2);
    }

    #[test]
    fn test_bad_containers() {
        assert!(matches!(json_chunk(b"glTF"), Err(GlbError::TooShort(4))));
        assert!(matches!(
            json_chunk(&[0u8; 16]),
            Err(GlbError::BadMagic(0))
        ));

        let mut truncated = write_json_glb(&json!({}));
        truncated.truncate(HEADER_LEN + CHUNK_HEADER_LEN + 1);
        let declared = (truncated.len() as u32).to_le_bytes();
        truncated[8..12].copy_from_slice(&declared);
        truncated[12..16].copy_from_slice(&64u32.to_le_bytes());
        assert!(matches!(json_chunk(&truncated), Err(GlbError::Truncated(12))));
    }

    #[test]
    fn test_pin_names() {
        assert_eq!(parse_pin_name("Pin_A101"), Some(("A101".to_string(), true)));
        assert_eq!(parse_pin_name("Pin#_Hall "), Some(("Hall".to_string(), false)));
        assert_eq!(parse_pin_name("Pin_"), None);
        assert_eq!(parse_pin_name("Pin_  "), None);
        assert_eq!(parse_pin_name("PinA101"), None);
        assert_eq!(parse_pin_name("Wall_Pin_A"), None);
    }

    #[test]
    fn test_empty_scene() {
        let bytes = write_json_glb(&json!({"asset": {"version": "2.0"}}));
        let scan = SceneScan::from_glb(&bytes).unwrap();
        assert!(scan.bounds.is_empty());
        assert!(scan.pins.is_empty());
    }
}
