use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyMode {
    K4,
    K5,
    K6,
    K7,
}

impl KeyMode {
    pub const ALL: [KeyMode; 4] = [Self::K4, Self::K5, Self::K6, Self::K7];

    /// Number of lanes (one key per lane)
    pub fn lane_count(self) -> usize {
        match self {
            Self::K4 => 4,
            Self::K5 => 5,
            Self::K6 => 6,
            Self::K7 => 7,
        }
    }

    pub fn from_lane_count(lanes: usize) -> Option<Self> {
        match lanes {
            4 => Some(Self::K4),
            5 => Some(Self::K5),
            6 => Some(Self::K6),
            7 => Some(Self::K7),
            _ => None,
        }
    }

    /// Short display name, e.g. "4K".
    pub fn name(self) -> &'static str {
        match self {
            Self::K4 => "4K",
            Self::K5 => "5K",
            Self::K6 => "6K",
            Self::K7 => "7K",
        }
    }
}
