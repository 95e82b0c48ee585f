use mania_rule::{Judgment, ScoreSnapshot};
use serde::Serialize;

use crate::session::SessionOutcome;

/// Clear lamp, from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ClearType {
    Failed,
    Clear,
    FullCombo,
    AllPerfect,
}

impl ClearType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Failed => "FAILED",
            Self::Clear => "CLEAR",
            Self::FullCombo => "FULL COMBO",
            Self::AllPerfect => "ALL PERFECT",
        }
    }
}

/// Letter grade from accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    SS,
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    /// SS at 100%, then S above 95%, A above 90%, B above 80%, C above 70%.
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 100.0 {
            Self::SS
        } else if accuracy > 95.0 {
            Self::S
        } else if accuracy > 90.0 {
            Self::A
        } else if accuracy > 80.0 {
            Self::B
        } else if accuracy > 70.0 {
            Self::C
        } else {
            Self::D
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResult {
    pub outcome: SessionOutcome,
    pub clear_type: ClearType,
    pub grade: Grade,
    pub score: ScoreSnapshot,
    /// Judgment events produced
    pub judgments_total: usize,
    /// Judgment events a complete play produces
    pub judgments_expected: usize,
}

impl PlayResult {
    pub(crate) fn new(
        outcome: SessionOutcome,
        score: ScoreSnapshot,
        judgments_total: usize,
        judgments_expected: usize,
    ) -> Self {
        let complete = judgments_total == judgments_expected;
        let clear_type = if outcome != SessionOutcome::Cleared {
            ClearType::Failed
        } else if complete && score.count(Judgment::Perfect) as usize == judgments_expected {
            ClearType::AllPerfect
        } else if complete && score.count(Judgment::Miss) == 0 {
            ClearType::FullCombo
        } else {
            ClearType::Clear
        };
        Self {
            outcome,
            clear_type,
            grade: Grade::from_accuracy(score.accuracy),
            score,
            judgments_total,
            judgments_expected,
        }
    }
}
