//! Viewer facade
//!
//! Owns the floor store, the pin registry, the camera and the room
//! directory. Store events are drained into the registry after every store
//! call, and everything a host should know about goes out on a broadcast
//! channel as [`ViewerEvent`]s.

use campus_core::{HostCommand, Manifest};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::camera::{CameraPose, CameraRig, CameraSettings};
use crate::events::{FloorEvent, ViewerEvent};
use crate::floors::{FloorStore, DEFAULT_FLOOR_Y_OFFSET};
use crate::loader::{load_manifest, LoadError};
use crate::picking::{pick, PickResult, PointerEvent, Viewport};
use crate::pins::{Marker, MarkerStyle, PinColor, PinRegistry};
use crate::rooms::RoomDirectory;
use crate::source::AssetSource;

const EVENT_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Failed to load manifest: {0}")]
    Manifest(#[from] LoadError),
}

#[derive(Debug, Clone)]
pub struct ViewerSettings {
    /// Manifest path relative to the model source
    pub manifest_path: String,
    pub floor_y_offset: f32,
    pub marker: MarkerStyle,
    pub camera: CameraSettings,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            manifest_path: "manifest.json".to_string(),
            floor_y_offset: DEFAULT_FLOOR_Y_OFFSET,
            marker: MarkerStyle::default(),
            camera: CameraSettings::default(),
        }
    }
}

pub struct Viewer {
    settings: ViewerSettings,
    models: Arc<dyn AssetSource>,
    store: FloorStore,
    floor_events: mpsc::UnboundedReceiver<FloorEvent>,
    pins: PinRegistry,
    camera: CameraRig,
    rooms: RoomDirectory,
    /// Pin whose popup is open
    popup: Option<String>,
    events: broadcast::Sender<ViewerEvent>,
}

impl Viewer {
    pub fn new(models: Arc<dyn AssetSource>, rooms: RoomDirectory, settings: ViewerSettings) -> Self {
        let (store, floor_events) = FloorStore::new(models.clone(), settings.floor_y_offset);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pins: PinRegistry::new(settings.marker),
            camera: CameraRig::new(settings.camera.clone()),
            settings,
            models,
            store,
            floor_events,
            rooms,
            popup: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &FloorStore {
        &self.store
    }

    pub fn pins(&self) -> &PinRegistry {
        &self.pins
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn open_popup_pin(&self) -> Option<&str> {
        self.popup.as_deref()
    }

    /// Load the manifest and show the first building's ground floor
    pub async fn init(&mut self) -> Result<(), ViewerError> {
        let manifest = load_manifest(self.models.as_ref(), &self.settings.manifest_path).await?;
        self.init_with_manifest(&manifest).await;
        Ok(())
    }

    pub async fn init_with_manifest(&mut self, manifest: &Manifest) {
        self.store.init_from_manifest(manifest).await;
        self.sync();
        info!(
            buildings = manifest.buildings.len(),
            pins = self.pins.len(),
            "Viewer ready"
        );
    }

    fn emit(&self, event: ViewerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_camera(&self, pose: CameraPose) {
        self.emit(ViewerEvent::CameraMoved(pose));
    }

    /// Apply pending store events to the registry
    fn sync(&mut self) {
        while let Ok(event) = self.floor_events.try_recv() {
            match event {
                FloorEvent::PinsLoaded(batch) => {
                    let Some((building, level)) =
                        batch.first().map(|p| (p.building.clone(), p.floor_level))
                    else {
                        continue;
                    };
                    let count = self.pins.add_pins(batch);
                    self.emit(ViewerEvent::PinsAdded {
                        building,
                        level,
                        count,
                    });
                }
                FloorEvent::VisibilityChanged {
                    building,
                    level,
                    visible,
                } => {
                    self.pins.set_pins_visibility(&building, level, visible);
                    self.emit(ViewerEvent::FloorVisibility {
                        building,
                        level,
                        visible,
                    });
                }
            }
        }
    }

    pub async fn set_floor_level(&mut self, building: &str, level: i32) -> bool {
        let ok = self.store.set_floor_level(building, level).await;
        self.sync();
        ok
    }

    pub async fn set_floor_level_for_focused(&mut self, level: i32) -> bool {
        let ok = self.store.set_floor_level_for_focused(level).await;
        self.sync();
        ok
    }

    pub async fn show_all_blocks(&mut self) {
        self.store.show_all_blocks().await;
        self.sync();
    }

    pub async fn enable_building(&mut self, building: &str, enabled: bool) -> bool {
        let ok = self.store.enable_building(building, enabled).await;
        self.sync();
        ok
    }

    pub async fn focus_building(&mut self, building: &str) -> bool {
        self.store.focus_building(building).await
    }

    /// Pointer press on the canvas.
    ///
    /// With a popup open any press closes it. Otherwise a hit on a popup pin
    /// opens its popup and returns the pin id.
    pub async fn pointer_down(&mut self, pointer: PointerEvent, viewport: Viewport) -> Option<String> {
        if self.popup.is_some() {
            self.close_popup(true);
            return None;
        }

        let ndc = viewport.to_ndc(pointer)?;
        self.camera.set_aspect(viewport.aspect());
        let ray = self.camera.ray_through(ndc);
        let blockers = self.store.blocking_meshes().await;

        match pick(&ray, self.pins.pickable_markers(), &blockers) {
            PickResult::Pin {
                building, level, id, ..
            } => {
                let marker = self.pins.marker_on(&building, level, &id)?.clone();
                self.emit(ViewerEvent::PinClicked {
                    pin_id: marker.id.clone(),
                    building: marker.building.clone(),
                    level: marker.level,
                    opens_popup: marker.opens_popup,
                });
                self.open_popup(&marker).await;
                Some(id)
            }
            PickResult::Occluded {
                id,
                blocker_distance,
            } => {
                debug!(pin = %id, blocker_distance, "Pin hidden behind geometry");
                None
            }
            PickResult::Miss => None,
        }
    }

    async fn open_popup(&mut self, marker: &Marker) {
        if !self.camera.has_saved() {
            self.camera.save();
        }
        let summary = self.rooms.summary(&marker.id, &marker.display_name).await;
        self.emit(ViewerEvent::PopupOpened(summary));
        let pose = self.camera.focus_on_pin(marker.position);
        self.emit_camera(pose);
        self.popup = Some(marker.id.clone());
    }

    /// Close the open popup; returns false when none was open
    pub fn close_popup(&mut self, restore_camera: bool) -> bool {
        let Some(pin_id) = self.popup.take() else {
            return false;
        };
        if restore_camera {
            if let Some(pose) = self.camera.restore() {
                self.emit_camera(pose);
            }
        } else {
            self.camera.clear_saved();
        }
        self.emit(ViewerEvent::PopupClosed { pin_id });
        true
    }

    /// Show only `building`, up to `level`, with that floor's pins active
    async fn isolate_floor(&mut self, building: &str, level: i32) {
        self.store.enable_only(building).await;
        self.store.set_floor_level(building, level).await;
        self.sync();
        self.pins.activate_floor_pins(building, level);
        self.store.focus_building(building).await;
    }

    pub async fn focus_on_pin(&mut self, pin_id: &str, open_popup: bool) -> bool {
        let Some(marker) = self.pins.marker(pin_id).cloned() else {
            warn!(pin = %pin_id, "Pin not found");
            return false;
        };

        self.close_popup(false);
        self.isolate_floor(&marker.building, marker.level).await;

        if open_popup && marker.opens_popup {
            self.open_popup(&marker).await;
        } else {
            let pose = self.camera.focus_on_pin(marker.position);
            self.emit_camera(pose);
        }
        true
    }

    pub async fn focus_on_floor(&mut self, building: &str, level: i32) -> bool {
        let Some(levels) = self.store.floor_levels(building).await else {
            warn!(building = %building, "Building not found");
            return false;
        };
        if !levels.contains(&level) {
            warn!(building = %building, level, "Floor not found");
            return false;
        }

        self.close_popup(false);
        self.isolate_floor(building, level).await;

        let pose = match self.store.floor_model(building, level).await {
            Some(model) => self.camera.focus_on_box_at_current_distance(&model.world_bounds()),
            None => match self.store.building_bounds(building).await {
                Some(bounds) => self.camera.fit_to_box(&bounds),
                None => None,
            },
        };
        if let Some(pose) = pose {
            self.emit_camera(pose);
        }
        true
    }

    pub async fn focus_on_building(&mut self, building: &str) -> bool {
        let Some(levels) = self.store.floor_levels(building).await else {
            warn!(building = %building, "Building not found");
            return false;
        };

        self.close_popup(false);
        self.store.enable_only(building).await;
        self.sync();
        self.pins.clear_floor_selections(true);

        if let Some(&max) = levels.last() {
            self.store.set_floor_level(building, max).await;
            self.sync();
        }

        if let Some(bounds) = self.store.building_bounds(building).await {
            if let Some(pose) = self.camera.fit_to_box(&bounds) {
                self.emit_camera(pose);
            }
        }
        self.store.focus_building(building).await;
        true
    }

    pub fn set_pin_color(&mut self, pin_id: &str, color: &str) -> bool {
        let Some(parsed) = PinColor::parse(color) else {
            warn!(pin = %pin_id, color = %color, "Invalid color");
            return false;
        };
        self.apply_pin_color(pin_id, parsed)
    }

    pub fn set_pin_color_preset(&mut self, pin_id: &str, preset: usize) -> bool {
        let Some(color) = PinColor::preset(preset) else {
            warn!(preset, "Invalid color preset");
            return false;
        };
        self.apply_pin_color(pin_id, color)
    }

    fn apply_pin_color(&mut self, pin_id: &str, color: PinColor) -> bool {
        if !self.pins.set_pin_color(pin_id, color) {
            return false;
        }
        self.emit(ViewerEvent::PinColorChanged {
            pin_id: pin_id.to_string(),
            color: color.to_hex(),
        });
        true
    }

    pub fn reset_camera(&mut self) -> CameraPose {
        let pose = self.camera.reset();
        self.emit_camera(pose);
        pose
    }

    /// Run a host command through the direct-call API
    pub async fn dispatch(&mut self, command: HostCommand) -> bool {
        debug!(command = command.kind(), "Dispatching host command");
        match command {
            HostCommand::FocusOnPin { pin_id, options } => {
                self.focus_on_pin(&pin_id, options.open_popup).await
            }
            HostCommand::FocusOnFloor {
                building_id,
                floor_level,
            } => self.focus_on_floor(&building_id, floor_level).await,
            HostCommand::FocusOnBuilding { building_id } => {
                self.focus_on_building(&building_id).await
            }
            HostCommand::SetPinColor { pin_id, color } => self.set_pin_color(&pin_id, &color),
            HostCommand::SetPinColorPreset {
                pin_id,
                preset_index,
            } => self.set_pin_color_preset(&pin_id, preset_index),
            HostCommand::ResetCamera => {
                self.reset_camera();
                true
            }
        }
    }
}
