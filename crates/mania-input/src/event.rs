use serde::{Deserialize, Serialize};

/// Key edge direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyEdge {
    Down,
    Up,
}

/// A lane key edge, timestamped in song time.
///
/// Capture code converts hardware timestamps to song time before building
/// events (see `AudioClock::time_at`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub lane: usize,
    pub edge: KeyEdge,
    /// Song time in microseconds
    pub time_us: i64,
}

impl InputEvent {
    pub fn down(lane: usize, time_us: i64) -> Self {
        Self {
            lane,
            edge: KeyEdge::Down,
            time_us,
        }
    }

    pub fn up(lane: usize, time_us: i64) -> Self {
        Self {
            lane,
            edge: KeyEdge::Up,
            time_us,
        }
    }

    pub fn is_down(&self) -> bool {
        self.edge == KeyEdge::Down
    }
}
