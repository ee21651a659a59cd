//! Shared fixtures for unit tests

use campus_core::glb::write_json_glb;
use campus_core::Manifest;
use serde_json::{json, Value};

use crate::source::MemorySource;

/// Two buildings: "A" with manifest pins on two floors, "B" whose pins come
/// from the model's pin nodes and which has a wall mesh.
pub(crate) const MANIFEST: &str = r#"{
    "A": {
        "name": "Bloco A",
        "bbox": {"min": [0, 0, 0], "max": [10, 6, 10]},
        "floors": [
            {"file": "floor0.glb", "name": "Térreo", "level": 0,
             "bbox": {"min": [0, 0, 0], "max": [10, 3, 10]},
             "pins": [{"id": "A001", "position": [2, 1, 2], "displayName": "Sala_de_Reuniao"}]},
            {"file": "floor1.glb", "name": "1º Pavimento", "level": 1,
             "bbox": {"min": [0, 3, 0], "max": [10, 6, 10]},
             "pins": [{"id": "A101", "position": [2, 4, 2]}]}
        ]
    },
    "B": {
        "name": "Bloco B",
        "sourceDir": "BlocoB",
        "floors": [
            {"file": "floor0.glb", "name": "Térreo", "level": 0}
        ]
    }
}"#;

pub(crate) fn manifest() -> Manifest {
    Manifest::from_json(MANIFEST).unwrap()
}

/// GLB with one box mesh per `(name, min, max)` and one empty node per pin
pub(crate) fn floor_glb(meshes: &[(&str, [f32; 3], [f32; 3])], pins: &[(&str, [f32; 3])]) -> Vec<u8> {
    let mut nodes: Vec<Value> = Vec::new();
    let mut gltf_meshes: Vec<Value> = Vec::new();
    let mut accessors: Vec<Value> = Vec::new();

    for (i, (name, min, max)) in meshes.iter().enumerate() {
        nodes.push(json!({"name": name, "mesh": i}));
        gltf_meshes.push(json!({"primitives": [{"attributes": {"POSITION": i}}]}));
        accessors.push(json!({"min": min, "max": max}));
    }
    for (name, translation) in pins {
        nodes.push(json!({"name": name, "translation": translation}));
    }
    let roots: Vec<usize> = (0..nodes.len()).collect();

    write_json_glb(&json!({
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": roots}],
        "nodes": nodes,
        "meshes": gltf_meshes,
        "accessors": accessors
    }))
}

pub(crate) fn campus_files() -> MemorySource {
    MemorySource::new()
        .with_file("manifest.json", MANIFEST.as_bytes().to_vec())
        .with_file(
            "A/floor0.glb",
            floor_glb(&[("Slab", [0.0, 0.0, 0.0], [10.0, 0.2, 10.0])], &[]),
        )
        .with_file(
            "A/floor1.glb",
            floor_glb(&[("Slab", [0.0, 3.0, 0.0], [10.0, 3.2, 10.0])], &[]),
        )
        .with_file(
            "BlocoB/floor0.glb",
            floor_glb(
                &[
                    ("Slab", [20.0, 0.0, 0.0], [30.0, 0.2, 10.0]),
                    ("Wall", [24.9, 0.0, 0.0], [25.1, 3.0, 10.0]),
                ],
                &[("Pin_B001", [28.0, 1.0, 5.0]), ("Pin#_Hall", [22.0, 1.0, 5.0])],
            ),
        )
}
