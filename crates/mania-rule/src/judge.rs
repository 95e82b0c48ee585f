use serde::{Deserialize, Serialize};

use crate::JUDGMENT_COUNT;

/// Judgment category, ordered by decreasing timing tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Judgment {
    Perfect,
    Great,
    Good,
    Miss,
}

impl Judgment {
    pub const ALL: [Judgment; JUDGMENT_COUNT] =
        [Self::Perfect, Self::Great, Self::Good, Self::Miss];

    /// Index into per-judgment tables (points, weights, life values, counts).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_miss(self) -> bool {
        self == Self::Miss
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Perfect => "PERFECT",
            Self::Great => "GREAT",
            Self::Good => "GOOD",
            Self::Miss => "MISS",
        }
    }
}

/// Which part of a note a judgment resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JudgeEventKind {
    /// The single judgment of a tap note
    TapComplete,
    /// Press of a hold note
    Head,
    /// Release of a hold note
    Tail,
}

/// What produced a judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JudgeSource {
    /// Matched to an input event
    Input,
    /// Resolved by the scheduler after the note's deadline passed
    AutoMiss,
}

/// One judgment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentResult {
    /// Index of the note in the beatmap's note list
    pub note_index: usize,
    pub lane: usize,
    pub judgment: Judgment,
    /// Event time minus the note's reference time (negative = early), microseconds
    pub offset_us: i64,
    pub kind: JudgeEventKind,
    pub source: JudgeSource,
}

impl JudgmentResult {
    pub fn offset_ms(&self) -> f64 {
        self.offset_us as f64 / 1_000.0
    }
}
