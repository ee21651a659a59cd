//! Pin registry
//!
//! Markers are grouped per (building, level). A group follows its floor's
//! visibility unless the building carries a floor focus override, and can be
//! force-hidden until the next visibility signal for it.

use campus_core::Aabb;
use glam::Vec3;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::events::PinPayload;

/// Maximum characters per label line
pub const LABEL_LINE_LIMIT: usize = 7;

/// Marker sprite geometry, in world units unless noted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub sprite_scale: f32,
    /// World units per label pixel
    pub pixel_to_world: f32,
    pub label_line_height_px: f32,
    /// Label padding plus border, in pixels
    pub label_chrome_px: f32,
    /// Gap between the label top and the pin sprite
    pub pin_margin: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            sprite_scale: 1.8,
            pixel_to_world: 0.05,
            label_line_height_px: 16.0,
            label_chrome_px: 8.0,
            pin_margin: 0.1,
        }
    }
}

impl MarkerStyle {
    /// Height of the pin sprite center above the pin position
    pub fn lift(&self, label_lines: usize) -> f32 {
        let label_height =
            (self.label_line_height_px * label_lines as f32 + self.label_chrome_px) * self.pixel_to_world;
        label_height + self.sprite_scale / 2.0 + self.pin_margin
    }
}

/// Marker tint, `#rrggbb` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinColor(pub [u8; 3]);

impl PinColor {
    pub const DEFAULT: PinColor = PinColor([0x1f, 0xd9, 0x7c]);
    pub const GREEN: PinColor = PinColor([0x00, 0xb0, 0x50]);
    pub const YELLOW: PinColor = PinColor([0xf2, 0xc2, 0x00]);
    pub const RED: PinColor = PinColor([0xd3, 0x2f, 0x2f]);

    pub const PRESETS: [PinColor; 3] = [Self::GREEN, Self::YELLOW, Self::RED];

    /// Parse `#rrggbb` (the `#` is optional)
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self([channel(0)?, channel(2)?, channel(4)?]))
    }

    pub fn preset(index: usize) -> Option<Self> {
        Self::PRESETS.get(index).copied()
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

impl Default for PinColor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Serialize for PinColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Label text: underscores to spaces, whitespace collapsed, wrapped by word
pub fn format_label(raw: &str, line_limit: usize) -> String {
    let cleaned = raw.replace('_', " ");
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    if words.is_empty() {
        return raw.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in words {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= line_limit {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    lines.push(current);
    lines.join("\n")
}

/// Per-building override of which floor's pins show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", content = "level", rename_all = "snake_case")]
pub enum FloorFocus {
    /// Follow floor visibility
    #[default]
    Inherit,
    /// Hide every pin of the building
    Hidden,
    /// Show only this floor's pins, if the floor itself is visible
    ShowFloor(i32),
}

impl FloorFocus {
    pub fn allows(&self, level: i32, parent_visible: bool) -> bool {
        match *self {
            FloorFocus::Inherit => parent_visible,
            FloorFocus::Hidden => false,
            FloorFocus::ShowFloor(focused) => focused == level && parent_visible,
        }
    }
}

/// A pin marker placed in the world
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: String,
    pub building: String,
    pub level: i32,
    /// Position in the floor model's local space
    pub local_position: Vec3,
    /// Sprite center in world space
    pub position: Vec3,
    pub display_name: String,
    /// Wrapped label text, lines joined by `\n`
    pub label: String,
    pub opens_popup: bool,
    pub color: PinColor,
    pub visible: bool,
    #[serde(skip)]
    size: f32,
}

impl Marker {
    /// Box used for pointer hit tests
    pub fn hit_box(&self) -> Aabb {
        Aabb::around(self.position, self.size / 2.0)
    }
}

#[derive(Debug, Default)]
struct PinGroup {
    markers: Vec<usize>,
    parent_visible: bool,
    force_hidden: bool,
}

type GroupKey = (String, i32);

#[derive(Debug, Default)]
pub struct PinRegistry {
    style: MarkerStyle,
    markers: Vec<Marker>,
    groups: BTreeMap<GroupKey, PinGroup>,
    focus: HashMap<String, FloorFocus>,
}

impl PinRegistry {
    pub fn new(style: MarkerStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }

    /// Create markers for a batch of pins; returns how many were added
    pub fn add_pins(&mut self, batch: Vec<PinPayload>) -> usize {
        let mut touched: Vec<GroupKey> = Vec::new();
        let count = batch.len();

        for pin in batch {
            let label = format_label(&pin.display_name, LABEL_LINE_LIMIT);
            let lift = self.style.lift(label.lines().count().max(1));
            let position = pin.parent.to_world(pin.position) + Vec3::new(0.0, lift, 0.0);

            let key = (pin.building.clone(), pin.floor_level);
            let group = self.groups.entry(key.clone()).or_insert_with(|| PinGroup {
                parent_visible: pin.parent_visible,
                ..Default::default()
            });
            group.markers.push(self.markers.len());

            debug!(pin = %pin.id, building = %pin.building, level = pin.floor_level, "Marker created");
            self.markers.push(Marker {
                id: pin.id,
                building: pin.building,
                level: pin.floor_level,
                local_position: pin.position,
                position,
                display_name: pin.display_name,
                label,
                opens_popup: pin.opens_popup,
                color: PinColor::DEFAULT,
                visible: false,
                size: self.style.sprite_scale,
            });
            if !touched.contains(&key) {
                touched.push(key);
            }
        }

        for key in &touched {
            self.refresh(key);
        }
        count
    }

    /// Parent floor visibility signal for one group
    pub fn set_pins_visibility(&mut self, building: &str, level: i32, visible: bool) {
        let key = (building.to_string(), level);
        let group = self.groups.entry(key.clone()).or_default();
        group.parent_visible = visible;
        group.force_hidden = false;
        self.refresh(&key);
    }

    /// Show only `level`'s pins for `building`
    pub fn activate_floor_pins(&mut self, building: &str, level: i32) {
        self.set_floor_focus(building, FloorFocus::ShowFloor(level));
    }

    pub fn set_floor_focus(&mut self, building: &str, focus: FloorFocus) {
        self.focus.insert(building.to_string(), focus);
        let keys: Vec<GroupKey> = self
            .groups
            .keys()
            .filter(|(b, _)| b == building)
            .cloned()
            .collect();
        for key in &keys {
            if let Some(group) = self.groups.get_mut(key) {
                group.force_hidden = false;
            }
            self.refresh(key);
        }
    }

    pub fn floor_focus(&self, building: &str) -> FloorFocus {
        self.focus.get(building).copied().unwrap_or_default()
    }

    /// Drop every override; with `hide_pins`, hide all groups until their
    /// next visibility signal
    pub fn clear_floor_selections(&mut self, hide_pins: bool) {
        self.focus.clear();
        let keys: Vec<GroupKey> = self.groups.keys().cloned().collect();
        for key in &keys {
            if let Some(group) = self.groups.get_mut(key) {
                group.force_hidden = hide_pins;
            }
            self.refresh(key);
        }
    }

    fn refresh(&mut self, key: &GroupKey) {
        let Some(group) = self.groups.get(key) else {
            return;
        };
        let focus = self.focus.get(&key.0).copied().unwrap_or_default();
        let visible = !group.force_hidden && focus.allows(key.1, group.parent_visible);
        for &index in &group.markers {
            self.markers[index].visible = visible;
        }
    }

    /// Recolor every marker with this id
    pub fn set_pin_color(&mut self, id: &str, color: PinColor) -> bool {
        let mut found = false;
        for marker in self.markers.iter_mut().filter(|m| m.id == id) {
            marker.color = color;
            found = true;
        }
        if !found {
            warn!(pin = %id, "Pin not found");
        }
        found
    }

    /// First marker with this id
    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    /// The marker with this id on one floor
    pub fn marker_on(&self, building: &str, level: i32, id: &str) -> Option<&Marker> {
        self.markers_on(building, level).find(|m| m.id == id)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn markers_on(&self, building: &str, level: i32) -> impl Iterator<Item = &Marker> + '_ {
        let key = (building.to_string(), level);
        self.groups
            .get(&key)
            .into_iter()
            .flat_map(|g| g.markers.iter())
            .map(|&i| &self.markers[i])
    }

    pub fn visible_markers(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.markers.iter().filter(|m| m.visible)
    }

    /// Visible markers that take part in hit tests
    pub fn pickable_markers(&self) -> impl Iterator<Item = &Marker> + '_ {
        self.visible_markers().filter(|m| m.opens_popup)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
