//! Directory walk that turns building folders of floor models into a manifest

use anyhow::{Context, Result};
use campus_core::glb::SceneScan;
use campus_core::manifest::floor_display_name;
use campus_core::{Aabb, BuildingDescriptor, FloorDescriptor, Manifest, PinDescriptor};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const HIDDEN_SUFFIX: &str = "_hidden";

/// Level of a `floorN.glb` file name, matched case-insensitively
pub fn floor_level(file_name: &str) -> Option<i32> {
    let lower = file_name.to_ascii_lowercase();
    let digits = lower.strip_prefix("floor")?.strip_suffix(".glb")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Split a directory name into the building key and its hidden flag
pub fn split_hidden(dir_name: &str) -> (String, bool) {
    let cut = dir_name.len().saturating_sub(HIDDEN_SUFFIX.len());
    match dir_name.get(cut..) {
        Some(tail) if cut > 0 && tail.eq_ignore_ascii_case(HIDDEN_SUFFIX) => {
            (dir_name[..cut].to_string(), true)
        }
        _ => (dir_name.to_string(), false),
    }
}

/// Display name for a building key: `blocoAdministrativo` and
/// `bloco_administrativo` both become `Bloco Administrativo`
pub fn pretty_building_name(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    let mut prev_lower = false;
    for c in key.chars() {
        if prev_lower && c.is_uppercase() {
            spaced.push(' ');
        }
        prev_lower = c.is_lowercase();
        spaced.push(if c == '_' || c == '-' { ' ' } else { c });
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Bounding box and pins of one floor file.
///
/// A file that cannot be read or parsed yields the zero box and no pins.
pub fn scan_floor(path: &Path) -> (Aabb, Vec<PinDescriptor>) {
    let scan = fs::read(path)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| SceneScan::from_glb(&bytes).map_err(anyhow::Error::from));

    match scan {
        Ok(scan) => {
            let bbox = if scan.bounds.is_empty() {
                Aabb::ZERO
            } else {
                scan.bounds
            };
            let pins = scan
                .pins
                .into_iter()
                .map(|pin| PinDescriptor {
                    id: pin.id,
                    position: pin.position,
                    opens_popup: pin.opens_popup,
                    display_name: None,
                })
                .collect();
            (bbox, pins)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to scan floor model");
            (Aabb::ZERO, Vec::new())
        }
    }
}

/// Scan one building directory, returning `None` when it holds no floors
pub fn scan_building(dir: &Path, dir_name: &str) -> Result<Option<BuildingDescriptor>> {
    let mut floors = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file = entry.file_name().to_string_lossy().into_owned();
        let Some(level) = floor_level(&file) else {
            continue;
        };

        let (bbox, pins) = scan_floor(&entry.path());
        debug!(file = %file, level, pins = pins.len(), "Scanned floor");
        floors.push(FloorDescriptor {
            file,
            name: floor_display_name(level),
            level,
            bbox,
            pins,
        });
    }

    if floors.is_empty() {
        return Ok(None);
    }
    floors.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.file.cmp(&b.file)));

    let mut bbox = Aabb::EMPTY;
    for floor in floors.iter().filter(|f| !f.bbox.is_unknown()) {
        bbox.expand_box(&floor.bbox);
    }

    let (id, hidden) = split_hidden(dir_name);
    Ok(Some(BuildingDescriptor {
        name: pretty_building_name(&id),
        id,
        bbox,
        floors,
        source_dir: Some(dir_name.to_string()),
        hidden,
    }))
}

/// Build the manifest for every building directory under `root`
pub fn build_manifest(root: &Path) -> Result<Manifest> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).with_context(|| format!("Failed to read {}", root.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    dirs.sort();

    let mut manifest = Manifest::default();
    for dir_name in dirs {
        match scan_building(&root.join(&dir_name), &dir_name)? {
            Some(building) => {
                if manifest.building(&building.id).is_some() {
                    warn!(directory = %dir_name, id = %building.id, "Duplicate building id, skipping");
                    continue;
                }
                info!(
                    id = %building.id,
                    floors = building.floors.len(),
                    hidden = building.hidden,
                    "Added building"
                );
                manifest.buildings.push(building);
            }
            None => debug!(directory = %dir_name, "No floor models, skipping"),
        }
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_core::glb::write_json_glb;
    use glam::Vec3;
    use serde_json::json;

    fn slab_glb(min: [f32; 3], max: [f32; 3], pins: &[(&str, [f32; 3])]) -> Vec<u8> {
        let mut nodes = vec![json!({"name": "Slab", "mesh": 0})];
        for (name, translation) in pins {
            nodes.push(json!({"name": name, "translation": translation}));
        }
        let roots: Vec<usize> = (0..nodes.len()).collect();
        write_json_glb(&json!({
            "scenes": [{"nodes": roots}],
            "nodes": nodes,
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "accessors": [{"min": min, "max": max}]
        }))
    }

    #[test]
    fn test_floor_level() {
        assert_eq!(floor_level("floor0.glb"), Some(0));
        assert_eq!(floor_level("FLOOR12.GLB"), Some(12));
        assert_eq!(floor_level("floor.glb"), None);
        assert_eq!(floor_level("floor1.gltf"), None);
        assert_eq!(floor_level("floor-1.glb"), None);
        assert_eq!(floor_level("roof1.glb"), None);
    }

    #[test]
    fn test_split_hidden() {
        assert_eq!(split_hidden("Biblioteca_hidden"), ("Biblioteca".to_string(), true));
        assert_eq!(split_hidden("Biblioteca_HIDDEN"), ("Biblioteca".to_string(), true));
        assert_eq!(split_hidden("BlocoA"), ("BlocoA".to_string(), false));
        assert_eq!(split_hidden("_hidden"), ("_hidden".to_string(), false));
    }

    #[test]
    fn test_pretty_building_name() {
        assert_eq!(pretty_building_name("blocoAdministrativo"), "Bloco Administrativo");
        assert_eq!(pretty_building_name("bloco_de-aulas"), "Bloco De Aulas");
        assert_eq!(pretty_building_name("IAUD"), "IAUD");
    }

    #[test]
    fn test_build_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        std::fs::create_dir_all(root.join("blocoA")).unwrap();
        std::fs::write(
            root.join("blocoA/floor1.glb"),
            slab_glb([0.0, 3.0, 0.0], [10.0, 3.2, 10.0], &[("Pin_A101", [2.0, 4.0, 2.0])]),
        )
        .unwrap();
        std::fs::write(
            root.join("blocoA/Floor0.GLB"),
            slab_glb([0.0, 0.0, 0.0], [10.0, 0.2, 10.0], &[("Pin#_Hall", [5.0, 1.0, 5.0])]),
        )
        .unwrap();
        std::fs::write(root.join("blocoA/notes.txt"), "ignored").unwrap();

        std::fs::create_dir_all(root.join("Anexo_hidden")).unwrap();
        std::fs::write(root.join("Anexo_hidden/floor0.glb"), b"not a model").unwrap();

        std::fs::create_dir_all(root.join("empty")).unwrap();

        let manifest = build_manifest(root).unwrap();
        let ids: Vec<&str> = manifest.buildings.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["Anexo", "blocoA"]);

        let anexo = manifest.building("Anexo").unwrap();
        assert!(anexo.hidden);
        assert_eq!(anexo.directory(), "Anexo_hidden");
        assert_eq!(anexo.floors[0].bbox, Aabb::ZERO);
        assert!(anexo.floors[0].pins.is_empty());
        assert!(anexo.bbox.is_empty());

        let bloco = manifest.building("blocoA").unwrap();
        assert_eq!(bloco.name, "Bloco A");
        assert!(!bloco.hidden);
        assert_eq!(bloco.floors.len(), 2);
        assert_eq!(bloco.floors[0].file, "Floor0.GLB");
        assert_eq!(bloco.floors[0].name, "Térreo");
        assert_eq!(bloco.floors[1].name, "1º Pavimento");
        assert_eq!(bloco.bbox, Aabb::new(Vec3::ZERO, Vec3::new(10.0, 3.2, 10.0)));

        let hall = &bloco.floors[0].pins[0];
        assert_eq!(hall.id, "Hall");
        assert!(!hall.opens_popup);
        let room = &bloco.floors[1].pins[0];
        assert_eq!(room.id, "A101");
        assert!(room.opens_popup);
        assert_eq!(room.position, Vec3::new(2.0, 4.0, 2.0));
    }

    #[test]
    fn test_output_reloads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("B")).unwrap();
        std::fs::write(
            dir.path().join("B/floor0.glb"),
            slab_glb([0.0, 0.0, 0.0], [4.0, 0.2, 4.0], &[("Pin_B001", [1.0, 1.0, 1.0])]),
        )
        .unwrap();

        let manifest = build_manifest(dir.path()).unwrap();
        let reloaded = Manifest::from_json(&manifest.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reloaded, manifest);
    }

    #[test]
    fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(build_manifest(&dir.path().join("nope")).is_err());
    }
}
