//! Building visibility state and the floor visibility rule
//!
//! A floor is visible when its building is enabled and its level is at or
//! below the building's cursor. A cursor of [`NO_FLOORS`] hides everything.

use std::collections::{HashMap, HashSet};

/// Cursor value meaning "no floor shown"
pub const NO_FLOORS: i32 = -1;

#[derive(Debug, Clone, Default)]
pub struct VisibilityState {
    enabled: HashSet<String>,
    cursors: HashMap<String, i32>,
}

/// Resolved visibility of one floor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorVisibility {
    pub building: String,
    pub level: i32,
    pub visible: bool,
}

impl VisibilityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when membership changed
    pub fn set_enabled(&mut self, building: &str, enabled: bool) -> bool {
        if enabled {
            self.enabled.insert(building.to_string())
        } else {
            self.enabled.remove(building)
        }
    }

    /// Enable exactly one building
    pub fn enable_only(&mut self, building: &str) {
        self.enabled.clear();
        self.enabled.insert(building.to_string());
    }

    pub fn is_enabled(&self, building: &str) -> bool {
        self.enabled.contains(building)
    }

    pub fn set_cursor(&mut self, building: &str, level: i32) {
        self.cursors.insert(building.to_string(), level);
    }

    pub fn cursor(&self, building: &str) -> i32 {
        self.cursors.get(building).copied().unwrap_or(NO_FLOORS)
    }

    pub fn floor_visible(&self, building: &str, level: i32) -> bool {
        self.is_enabled(building) && level <= self.cursor(building)
    }

    /// Resolve every (building, level) pair
    pub fn resolve<'a, I>(&self, floors: I) -> Vec<FloorVisibility>
    where
        I: IntoIterator<Item = (&'a str, i32)>,
    {
        floors
            .into_iter()
            .map(|(building, level)| FloorVisibility {
                building: building.to_string(),
                level,
                visible: self.floor_visible(building, level),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule() {
        let mut state = VisibilityState::new();
        assert!(!state.floor_visible("A", 0));

        state.set_cursor("A", 1);
        assert!(!state.floor_visible("A", 0), "disabled building hides floors");

        assert!(state.set_enabled("A", true));
        assert!(!state.set_enabled("A", true));
        assert!(state.floor_visible("A", 0));
        assert!(state.floor_visible("A", 1));
        assert!(!state.floor_visible("A", 2));

        state.set_cursor("A", NO_FLOORS);
        assert!(!state.floor_visible("A", 0));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut state = VisibilityState::new();
        state.set_enabled("A", true);
        state.set_enabled("B", true);
        state.set_cursor("A", 0);
        state.enable_only("A");

        let floors = [("A", 0), ("A", 1), ("B", 0)];
        let first = state.resolve(floors);
        let second = state.resolve(floors);
        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|f| f.visible).collect::<Vec<_>>(),
            vec![true, false, false]
        );
    }
}
