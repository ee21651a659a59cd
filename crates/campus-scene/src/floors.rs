//! Floor entry store
//!
//! One entry per floor in the manifest. Geometry is fetched lazily the first
//! time a floor is needed and kept for the life of the store. Every entry
//! owns an in-flight slot, so concurrent first loads of the same floor share
//! a single fetch and a failed load leaves the slot empty for a later retry.

use campus_core::{Aabb, BuildingDescriptor, FloorDescriptor, Manifest, PinDescriptor};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::{FloorEvent, PinPayload};
use crate::loader::{load_floor_model, FloorModel};
use crate::source::AssetSource;
use crate::visibility::{VisibilityState, NO_FLOORS};

/// Vertical placement offset applied to every floor model
pub const DEFAULT_FLOOR_Y_OFFSET: f32 = 0.5;

struct FloorEntry {
    key: String,
    level: i32,
    name: String,
    path: String,
    bbox: Aabb,
    pins: Vec<PinDescriptor>,
    slot: Arc<OnceCell<Arc<FloorModel>>>,
    visible: bool,
    pins_emitted: bool,
}

impl FloorEntry {
    fn new(building: &BuildingDescriptor, floor: &FloorDescriptor) -> Self {
        Self {
            key: format!("{}:floor{}", building.id, floor.level),
            level: floor.level,
            name: floor.name.clone(),
            path: format!("{}/{}", building.directory(), floor.file),
            bbox: floor.bbox,
            pins: floor.pins.clone(),
            slot: Arc::new(OnceCell::new()),
            visible: false,
            pins_emitted: false,
        }
    }

    fn model(&self) -> Option<&Arc<FloorModel>> {
        self.slot.get()
    }
}

struct BuildingEntry {
    id: String,
    name: String,
    hidden: bool,
    bbox: Aabb,
    floors: BTreeMap<i32, FloorEntry>,
}

#[derive(Default)]
struct StoreState {
    buildings: Vec<BuildingEntry>,
    visibility: VisibilityState,
    focused: Option<String>,
}

impl StoreState {
    fn building(&self, id: &str) -> Option<&BuildingEntry> {
        self.buildings.iter().find(|b| b.id == id)
    }

    fn entry(&self, building: &str, level: i32) -> Option<&FloorEntry> {
        self.building(building)?.floors.get(&level)
    }

    fn entry_mut(&mut self, building: &str, level: i32) -> Option<&mut FloorEntry> {
        self.buildings
            .iter_mut()
            .find(|b| b.id == building)?
            .floors
            .get_mut(&level)
    }
}

/// Floor status for API listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloorSummary {
    pub key: String,
    pub level: i32,
    pub name: String,
    pub path: String,
    pub loaded: bool,
    pub visible: bool,
}

/// Building status for API listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingSummary {
    pub id: String,
    pub name: String,
    pub hidden: bool,
    pub enabled: bool,
    pub focused: bool,
    pub cursor: i32,
    pub floors: Vec<FloorSummary>,
}

pub struct FloorStore {
    source: Arc<dyn AssetSource>,
    y_offset: f32,
    state: RwLock<StoreState>,
    events: mpsc::UnboundedSender<FloorEvent>,
}

impl FloorStore {
    /// Create an empty store and the receiver for its events
    pub fn new(
        source: Arc<dyn AssetSource>,
        y_offset: f32,
    ) -> (Self, mpsc::UnboundedReceiver<FloorEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let store = Self {
            source,
            y_offset,
            state: RwLock::new(StoreState::default()),
            events,
        };
        (store, rx)
    }

    /// Build the entry table, then show the ground floor of the first building
    pub async fn init_from_manifest(&self, manifest: &Manifest) {
        let first = {
            let mut state = self.state.write().await;
            *state = StoreState::default();

            for building in &manifest.buildings {
                let mut floors = BTreeMap::new();
                for floor in &building.floors {
                    if floors
                        .insert(floor.level, FloorEntry::new(building, floor))
                        .is_some()
                    {
                        warn!(
                            building = %building.id,
                            level = floor.level,
                            "Duplicate floor level, keeping the last one"
                        );
                    }
                }
                state.visibility.set_cursor(&building.id, NO_FLOORS);
                state.buildings.push(BuildingEntry {
                    id: building.id.clone(),
                    name: building.name.clone(),
                    hidden: building.hidden,
                    bbox: building.bbox,
                    floors,
                });
            }

            info!(
                buildings = state.buildings.len(),
                floors = state.buildings.iter().map(|b| b.floors.len()).sum::<usize>(),
                "Floor store initialized"
            );
            manifest.first_building().map(|b| b.id.clone())
        };

        if let Some(first) = first {
            self.focus_building(&first).await;
            self.enable_building(&first, true).await;
            self.set_floor_level(&first, 0).await;
        }
    }

    /// Load a floor's geometry if needed.
    ///
    /// Returns false for unknown floors and failed loads. Pins are emitted
    /// exactly once, after the first successful load.
    pub async fn ensure_loaded(&self, building: &str, level: i32) -> bool {
        let (slot, path, key) = {
            let state = self.state.read().await;
            match state.entry(building, level) {
                Some(entry) => (entry.slot.clone(), entry.path.clone(), entry.key.clone()),
                None => {
                    debug!(building = %building, level, "No floor entry");
                    return false;
                }
            }
        };

        let source = self.source.clone();
        let y_offset = self.y_offset;
        let result = slot
            .get_or_try_init(|| async {
                load_floor_model(source.as_ref(), &path, y_offset)
                    .await
                    .map(Arc::new)
            })
            .await;

        match result {
            Ok(model) => {
                self.emit_pins(building, level, model.clone()).await;
                true
            }
            Err(e) => {
                error!(floor = %key, location = %self.source.locate(&path), error = %e, "Failed to load floor");
                false
            }
        }
    }

    async fn emit_pins(&self, building: &str, level: i32, model: Arc<FloorModel>) {
        let batch: Vec<PinPayload> = {
            let mut state = self.state.write().await;
            let Some(entry) = state.entry_mut(building, level) else {
                return;
            };
            if entry.pins_emitted {
                return;
            }
            entry.pins_emitted = true;

            if entry.pins.is_empty() && !model.scan.pins.is_empty() {
                debug!(
                    floor = %entry.key,
                    count = model.scan.pins.len(),
                    "Using pin nodes from the floor model"
                );
                entry.pins = model
                    .scan
                    .pins
                    .iter()
                    .map(|p| PinDescriptor {
                        id: p.id.clone(),
                        position: p.position,
                        opens_popup: p.opens_popup,
                        display_name: None,
                    })
                    .collect();
            }

            entry
                .pins
                .iter()
                .map(|pin| PinPayload {
                    id: pin.id.clone(),
                    position: pin.position,
                    building: building.to_string(),
                    floor_level: level,
                    parent: model.clone(),
                    display_name: pin.label().to_string(),
                    opens_popup: pin.opens_popup,
                    parent_visible: entry.visible,
                })
                .collect()
        };

        if batch.is_empty() {
            return;
        }
        info!(building = %building, level, count = batch.len(), "Pins loaded");
        let _ = self.events.send(FloorEvent::PinsLoaded(batch));
    }

    /// Load every floor up to `level`, then show exactly those floors
    pub async fn set_floor_level(&self, building: &str, level: i32) -> bool {
        let levels: Vec<i32> = {
            let state = self.state.read().await;
            match state.building(building) {
                Some(b) => b.floors.range(..=level).map(|(l, _)| *l).collect(),
                None => {
                    warn!(building = %building, "Unknown building");
                    return false;
                }
            }
        };

        join_all(levels.iter().map(|&l| self.ensure_loaded(building, l))).await;

        self.state
            .write()
            .await
            .visibility
            .set_cursor(building, level);
        self.apply_visibility().await;
        true
    }

    /// [`Self::set_floor_level`] on the focused building
    pub async fn set_floor_level_for_focused(&self, level: i32) -> bool {
        let focused = self.state.read().await.focused.clone();
        match focused {
            Some(building) => self.set_floor_level(&building, level).await,
            None => {
                warn!("No building focused");
                false
            }
        }
    }

    /// Enable every building and show all of its floors
    pub async fn show_all_blocks(&self) {
        let plan: Vec<(String, Vec<i32>)> = {
            let mut state = self.state.write().await;
            let plan: Vec<(String, Vec<i32>)> = state
                .buildings
                .iter()
                .map(|b| (b.id.clone(), b.floors.keys().copied().collect()))
                .collect();
            for (id, _) in &plan {
                state.visibility.set_enabled(id, true);
            }
            plan
        };

        join_all(
            plan.iter()
                .flat_map(|(b, levels)| levels.iter().map(move |&l| self.ensure_loaded(b, l))),
        )
        .await;

        {
            let mut state = self.state.write().await;
            for (building, levels) in &plan {
                if let Some(&max) = levels.last() {
                    state.visibility.set_cursor(building, max);
                }
            }
        }
        self.apply_visibility().await;
    }

    pub async fn enable_building(&self, building: &str, enabled: bool) -> bool {
        {
            let mut state = self.state.write().await;
            if state.building(building).is_none() {
                warn!(building = %building, "Unknown building");
                return false;
            }
            state.visibility.set_enabled(building, enabled);
        }
        self.apply_visibility().await;
        true
    }

    /// Disable every building except `building`
    pub async fn enable_only(&self, building: &str) -> bool {
        {
            let mut state = self.state.write().await;
            if state.building(building).is_none() {
                warn!(building = %building, "Unknown building");
                return false;
            }
            state.visibility.enable_only(building);
        }
        self.apply_visibility().await;
        true
    }

    /// Select the building the floor controls act on
    pub async fn focus_building(&self, building: &str) -> bool {
        let mut state = self.state.write().await;
        if state.building(building).is_none() {
            warn!(building = %building, "Unknown building");
            return false;
        }
        state.focused = Some(building.to_string());
        true
    }

    pub async fn focused_building(&self) -> Option<String> {
        self.state.read().await.focused.clone()
    }

    async fn apply_visibility(&self) {
        let mut state = self.state.write().await;
        let resolved = state.visibility.resolve(
            state
                .buildings
                .iter()
                .flat_map(|b| b.floors.keys().map(move |&l| (b.id.as_str(), l))),
        );

        for floor in resolved {
            if let Some(entry) = state.entry_mut(&floor.building, floor.level) {
                entry.visible = floor.visible;
            }
            let _ = self.events.send(FloorEvent::VisibilityChanged {
                building: floor.building,
                level: floor.level,
                visible: floor.visible,
            });
        }
    }

    pub async fn cursor(&self, building: &str) -> Option<i32> {
        let state = self.state.read().await;
        state.building(building)?;
        Some(state.visibility.cursor(building))
    }

    pub async fn is_enabled(&self, building: &str) -> bool {
        self.state.read().await.visibility.is_enabled(building)
    }

    pub async fn is_floor_visible(&self, building: &str, level: i32) -> Option<bool> {
        self.state
            .read()
            .await
            .entry(building, level)
            .map(|e| e.visible)
    }

    pub async fn floor_model(&self, building: &str, level: i32) -> Option<Arc<FloorModel>> {
        self.state
            .read()
            .await
            .entry(building, level)?
            .model()
            .cloned()
    }

    /// Levels of a building, ascending
    pub async fn floor_levels(&self, building: &str) -> Option<Vec<i32>> {
        self.state
            .read()
            .await
            .building(building)
            .map(|b| b.floors.keys().copied().collect())
    }

    /// Building box from the manifest, or the union of what is known about its floors
    pub async fn building_bounds(&self, building: &str) -> Option<Aabb> {
        let state = self.state.read().await;
        let b = state.building(building)?;
        if !b.bbox.is_unknown() {
            return Some(b.bbox);
        }

        let mut bounds = Aabb::EMPTY;
        for entry in b.floors.values() {
            match entry.model() {
                Some(model) => bounds.expand_box(&model.world_bounds()),
                None if !entry.bbox.is_unknown() => bounds.expand_box(&entry.bbox),
                None => {}
            }
        }
        (!bounds.is_empty()).then_some(bounds)
    }

    /// World boxes of every mesh on a visible, loaded floor
    pub async fn blocking_meshes(&self) -> Vec<Aabb> {
        let state = self.state.read().await;
        state
            .buildings
            .iter()
            .flat_map(|b| b.floors.values())
            .filter(|e| e.visible)
            .filter_map(FloorEntry::model)
            .flat_map(|m| m.world_meshes().collect::<Vec<_>>())
            .collect()
    }

    pub async fn buildings(&self) -> Vec<BuildingSummary> {
        let state = self.state.read().await;
        state
            .buildings
            .iter()
            .map(|b| BuildingSummary {
                id: b.id.clone(),
                name: b.name.clone(),
                hidden: b.hidden,
                enabled: state.visibility.is_enabled(&b.id),
                focused: state.focused.as_deref() == Some(b.id.as_str()),
                cursor: state.visibility.cursor(&b.id),
                floors: b
                    .floors
                    .values()
                    .map(|e| FloorSummary {
                        key: e.key.clone(),
                        level: e.level,
                        name: e.name.clone(),
                        path: e.path.clone(),
                        loaded: e.model().is_some(),
                        visible: e.visible,
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::testing::{campus_files, manifest};
    use std::time::Duration;

    fn store_with(source: Arc<MemorySource>) -> (FloorStore, mpsc::UnboundedReceiver<FloorEvent>) {
        FloorStore::new(source, DEFAULT_FLOOR_Y_OFFSET)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<FloorEvent>) -> Vec<FloorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_init_shows_first_building_ground_floor() {
        let source = Arc::new(campus_files());
        let (store, mut rx) = store_with(source.clone());
        store.init_from_manifest(&manifest()).await;

        assert!(store.is_enabled("A").await);
        assert!(!store.is_enabled("B").await);
        assert_eq!(store.focused_building().await.as_deref(), Some("A"));
        assert_eq!(store.cursor("A").await, Some(0));
        assert_eq!(store.cursor("B").await, Some(NO_FLOORS));
        assert_eq!(store.is_floor_visible("A", 0).await, Some(true));
        assert_eq!(store.is_floor_visible("A", 1).await, Some(false));
        assert!(store.floor_model("A", 1).await.is_none());
        assert_eq!(source.fetch_count("A/floor1.glb"), 0);

        let events = drain(&mut rx);
        let pins: Vec<&PinPayload> = events
            .iter()
            .filter_map(|e| match e {
                FloorEvent::PinsLoaded(batch) => Some(batch),
                _ => None,
            })
            .flatten()
            .collect();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].id, "A001");
        assert_eq!(pins[0].display_name, "Sala_de_Reuniao");
        assert_eq!(pins[0].parent.offset.y, DEFAULT_FLOOR_Y_OFFSET);
    }

    #[tokio::test]
    async fn test_set_floor_level() {
        let (store, mut rx) = store_with(Arc::new(campus_files()));
        store.init_from_manifest(&manifest()).await;
        drain(&mut rx);

        assert!(store.set_floor_level("A", 1).await);
        assert_eq!(store.is_floor_visible("A", 0).await, Some(true));
        assert_eq!(store.is_floor_visible("A", 1).await, Some(true));

        let events = drain(&mut rx);
        let visibility: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, FloorEvent::VisibilityChanged { .. }))
            .collect();
        // One per entry per pass: A0, A1, B0
        assert_eq!(visibility.len(), 3);

        assert!(store.set_floor_level("A", 0).await);
        assert_eq!(store.is_floor_visible("A", 1).await, Some(false));
        assert!(store.floor_model("A", 1).await.is_some(), "geometry is kept");

        assert!(!store.set_floor_level("Nope", 0).await);
    }

    #[tokio::test]
    async fn test_ensure_loaded_is_idempotent() {
        let source = Arc::new(campus_files());
        let (store, mut rx) = store_with(source.clone());
        store.init_from_manifest(&manifest()).await;
        drain(&mut rx);

        assert!(store.ensure_loaded("A", 1).await);
        assert!(store.ensure_loaded("A", 1).await);
        assert_eq!(source.fetch_count("A/floor1.glb"), 1);

        let batches = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, FloorEvent::PinsLoaded(_)))
            .count();
        assert_eq!(batches, 1);

        assert!(!store.ensure_loaded("A", 7).await);
    }

    #[tokio::test]
    async fn test_concurrent_first_loads_share_one_fetch() {
        let source = Arc::new(campus_files().with_latency(Duration::from_millis(20)));
        let (store, mut rx) = store_with(source.clone());
        store.init_from_manifest(&manifest()).await;
        drain(&mut rx);

        let (a, b) = tokio::join!(store.ensure_loaded("B", 0), store.ensure_loaded("B", 0));
        assert!(a && b);
        assert_eq!(source.fetch_count("BlocoB/floor0.glb"), 1);

        let batches = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, FloorEvent::PinsLoaded(_)))
            .count();
        assert_eq!(batches, 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_retryable() {
        let source = Arc::new(campus_files().with_failures("A/floor1.glb", 1));
        let (store, mut rx) = store_with(source.clone());
        store.init_from_manifest(&manifest()).await;

        // The failing sibling does not block the rest
        assert!(store.set_floor_level("A", 1).await);
        assert!(store.floor_model("A", 0).await.is_some());
        assert!(store.floor_model("A", 1).await.is_none());
        assert_eq!(store.cursor("A").await, Some(1));

        assert!(store.ensure_loaded("A", 1).await);
        assert_eq!(source.fetch_count("A/floor1.glb"), 2);

        let pins: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                FloorEvent::PinsLoaded(batch) => Some(batch),
                _ => None,
            })
            .flatten()
            .map(|p| p.id)
            .collect();
        assert_eq!(pins, vec!["A001".to_string(), "A101".to_string()]);
    }

    #[tokio::test]
    async fn test_show_all_blocks() {
        let (store, mut rx) = store_with(Arc::new(campus_files()));
        store.init_from_manifest(&manifest()).await;
        drain(&mut rx);

        store.show_all_blocks().await;
        assert_eq!(store.cursor("A").await, Some(1));
        assert_eq!(store.cursor("B").await, Some(0));
        for (building, level) in [("A", 0), ("A", 1), ("B", 0)] {
            assert_eq!(store.is_floor_visible(building, level).await, Some(true));
        }

        // B lists no pins in the manifest, so they come from the model nodes
        let b_pins: Vec<PinPayload> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                FloorEvent::PinsLoaded(batch) => Some(batch),
                _ => None,
            })
            .flatten()
            .filter(|p| p.building == "B")
            .collect();
        assert_eq!(b_pins.len(), 2);
        assert!(b_pins.iter().any(|p| p.id == "Hall" && !p.opens_popup));
        assert!(b_pins.iter().any(|p| p.id == "B001" && p.opens_popup));
    }

    #[tokio::test]
    async fn test_enable_and_focus() {
        let (store, _rx) = store_with(Arc::new(campus_files()));
        store.init_from_manifest(&manifest()).await;

        assert!(store.enable_building("A", false).await);
        assert_eq!(store.is_floor_visible("A", 0).await, Some(false));
        assert!(!store.enable_building("Nope", true).await);

        assert!(store.focus_building("B").await);
        assert!(store.enable_only("B").await);
        assert!(store.set_floor_level_for_focused(0).await);
        assert_eq!(store.is_floor_visible("B", 0).await, Some(true));
        assert!(!store.is_enabled("A").await);
        assert!(!store.focus_building("Nope").await);
    }

    #[tokio::test]
    async fn test_bounds_and_blockers() {
        let (store, _rx) = store_with(Arc::new(campus_files()));
        store.init_from_manifest(&manifest()).await;

        let a = store.building_bounds("A").await.unwrap();
        assert_eq!(a.max.y, 6.0);
        // B has no manifest box and nothing loaded yet
        assert!(store.building_bounds("B").await.is_none());

        assert_eq!(store.blocking_meshes().await.len(), 1);
        store.show_all_blocks().await;
        assert_eq!(store.blocking_meshes().await.len(), 4);

        let b = store.building_bounds("B").await.unwrap();
        assert_eq!(b.min.x, 20.0);
        assert_eq!(b.min.y, DEFAULT_FLOOR_Y_OFFSET);

        let summaries = store.buildings().await;
        assert_eq!(summaries[0].id, "A");
        assert!(summaries[0].focused);
        assert!(summaries[1].floors[0].loaded);
        assert_eq!(summaries[1].floors[0].path, "BlocoB/floor0.glb");
    }
}
