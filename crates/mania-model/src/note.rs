use serde::{Deserialize, Serialize};

/// The type of a note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    /// Single press, judged once
    Tap,
    /// Press-and-hold, judged at the head (press) and the tail (release)
    Hold,
}

/// A single note in the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSpec {
    /// Lane index (0-indexed)
    pub lane: usize,
    /// Note kind
    pub kind: NoteKind,
    /// Start time in microseconds
    pub time_us: i64,
    /// End time in microseconds (equal to `time_us` for taps)
    pub end_time_us: i64,
}

impl NoteSpec {
    pub fn tap(lane: usize, time_us: i64) -> Self {
        Self {
            lane,
            kind: NoteKind::Tap,
            time_us,
            end_time_us: time_us,
        }
    }

    pub fn hold(lane: usize, time_us: i64, end_time_us: i64) -> Self {
        Self {
            lane,
            kind: NoteKind::Hold,
            time_us,
            end_time_us,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.kind == NoteKind::Hold
    }

    /// Hold length in microseconds (0 for taps).
    pub fn duration_us(&self) -> i64 {
        self.end_time_us - self.time_us
    }
}
