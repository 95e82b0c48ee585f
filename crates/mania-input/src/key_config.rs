use std::collections::HashMap;

use mania_model::KeyMode;
use serde::{Deserialize, Serialize};

use crate::event::{InputEvent, KeyEdge};

/// Key names bound to each lane, one layout per key mode.
///
/// Key names are whatever the capture layer reports (lowercase letters,
/// `space`, ...); matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyBindings {
    pub k4: Vec<String>,
    pub k5: Vec<String>,
    pub k6: Vec<String>,
    pub k7: Vec<String>,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            k4: Self::default_for(KeyMode::K4),
            k5: Self::default_for(KeyMode::K5),
            k6: Self::default_for(KeyMode::K6),
            k7: Self::default_for(KeyMode::K7),
        }
    }
}

impl KeyBindings {
    pub fn default_for(mode: KeyMode) -> Vec<String> {
        match mode {
            KeyMode::K4 => keys(&["d", "f", "j", "k"]),
            KeyMode::K5 => keys(&["d", "f", "space", "j", "k"]),
            KeyMode::K6 => keys(&["s", "d", "f", "j", "k", "l"]),
            KeyMode::K7 => keys(&["s", "d", "f", "space", "j", "k", "l"]),
        }
    }

    pub fn for_mode(&self, mode: KeyMode) -> &[String] {
        match mode {
            KeyMode::K4 => &self.k4,
            KeyMode::K5 => &self.k5,
            KeyMode::K6 => &self.k6,
            KeyMode::K7 => &self.k7,
        }
    }

    fn for_mode_mut(&mut self, mode: KeyMode) -> &mut Vec<String> {
        match mode {
            KeyMode::K4 => &mut self.k4,
            KeyMode::K5 => &mut self.k5,
            KeyMode::K6 => &mut self.k6,
            KeyMode::K7 => &mut self.k7,
        }
    }

    /// Reset any layout with the wrong key count or a duplicated key.
    pub fn validate(&mut self) {
        for mode in KeyMode::ALL {
            let layout = self.for_mode_mut(mode);
            let mut seen: Vec<String> = Vec::with_capacity(layout.len());
            let mut duplicate = false;
            for key in layout.iter() {
                let key = key.to_lowercase();
                if seen.contains(&key) {
                    duplicate = true;
                }
                seen.push(key);
            }
            if layout.len() != mode.lane_count() || duplicate {
                log::warn!(
                    "invalid {} key layout {:?}, using defaults",
                    mode.name(),
                    layout
                );
                *layout = Self::default_for(mode);
            }
        }
    }
}

/// Translates key names to lane events for one key mode.
#[derive(Debug, Clone)]
pub struct KeyMapper {
    lanes: HashMap<String, usize>,
}

impl KeyMapper {
    pub fn new(bindings: &KeyBindings, mode: KeyMode) -> Self {
        let lanes = bindings
            .for_mode(mode)
            .iter()
            .take(mode.lane_count())
            .enumerate()
            .map(|(lane, key)| (key.to_lowercase(), lane))
            .collect();
        Self { lanes }
    }

    pub fn lane_of(&self, key: &str) -> Option<usize> {
        self.lanes.get(&key.to_lowercase()).copied()
    }

    /// Build the event for a key edge, or `None` for an unbound key.
    pub fn map(&self, key: &str, edge: KeyEdge, time_us: i64) -> Option<InputEvent> {
        self.lane_of(key).map(|lane| InputEvent { lane, edge, time_us })
    }
}
