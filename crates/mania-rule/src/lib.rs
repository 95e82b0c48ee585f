// Judgment categories, timing windows, note scheduling, input matching, scoring and life

mod judge;
mod judge_engine;
mod judge_property;
mod life;
mod scheduler;
mod score;

pub use judge::{JudgeEventKind, JudgeSource, Judgment, JudgmentResult};
pub use judge_engine::JudgeEngine;
pub use judge_property::{JudgeProperty, JudgeWindowTable};
pub use life::{LifeGauge, LifeProperty};
pub use scheduler::{NoteScheduler, NoteState, ScheduledNote};
pub use score::{HoldComboPolicy, ScoreAccumulator, ScoreProperty, ScoreSnapshot};

/// Number of judgment categories: Perfect, Great, Good, Miss.
pub const JUDGMENT_COUNT: usize = 4;
