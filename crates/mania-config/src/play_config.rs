use std::path::Path;

use anyhow::{Context, Result};
use mania_input::KeyBindings;
use mania_model::{Beatmap, US_PER_MS};
use mania_rule::{JudgeProperty, LifeProperty, ScoreProperty};
use serde::{Deserialize, Serialize};

pub const OFFSET_MAX: i32 = 500;
pub const OFFSET_MIN: i32 = -500;
pub const STALL_THRESHOLD_MAX: i32 = 5000;
pub const STALL_THRESHOLD_MIN: i32 = 16;
pub const INPUT_FUTURE_TOLERANCE_MAX: i32 = 1000;
pub const INPUT_FUTURE_TOLERANCE_MIN: i32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct PlayConfig {
    /// User offset added to song time, in ms (positive = judge later)
    pub offset_ms: i32,
    /// No backend position change for this long counts as an audio stall
    pub stall_threshold_ms: i32,
    /// Input stamped further than this ahead of the clock is discarded
    pub input_future_tolerance_ms: i32,
    /// Derive judge windows from the chart's OverallDifficulty instead of `judge`
    pub use_chart_difficulty: bool,
    pub judge: JudgeProperty,
    pub score: ScoreProperty,
    pub life: LifeProperty,
    pub key_bindings: KeyBindings,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            offset_ms: 0,
            stall_threshold_ms: 250,
            input_future_tolerance_ms: 50,
            use_chart_difficulty: false,
            judge: JudgeProperty::default(),
            score: ScoreProperty::default(),
            life: LifeProperty::default(),
            key_bindings: KeyBindings::default(),
        }
    }
}

impl PlayConfig {
    pub fn validate(&mut self) {
        if !(OFFSET_MIN..=OFFSET_MAX).contains(&self.offset_ms) {
            log::warn!(
                "offset {}ms out of range, clamped to {OFFSET_MIN}..={OFFSET_MAX}",
                self.offset_ms
            );
        }
        self.offset_ms = self.offset_ms.clamp(OFFSET_MIN, OFFSET_MAX);
        self.stall_threshold_ms = self
            .stall_threshold_ms
            .clamp(STALL_THRESHOLD_MIN, STALL_THRESHOLD_MAX);
        self.input_future_tolerance_ms = self
            .input_future_tolerance_ms
            .clamp(INPUT_FUTURE_TOLERANCE_MIN, INPUT_FUTURE_TOLERANCE_MAX);
        self.judge.validate();
        self.score.validate();
        self.life.validate();
        self.key_bindings.validate();
    }

    /// Read and validate a config file.
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: PlayConfig = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate();
        Ok(config)
    }

    /// Write config to a JSON file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write config {}", path.display()))?;
        Ok(())
    }

    pub fn offset_us(&self) -> i64 {
        self.offset_ms as i64 * US_PER_MS
    }

    pub fn stall_threshold_us(&self) -> i64 {
        self.stall_threshold_ms as i64 * US_PER_MS
    }

    pub fn input_future_tolerance_us(&self) -> i64 {
        self.input_future_tolerance_ms as i64 * US_PER_MS
    }

    /// Judge windows to use for a chart, with inconsistent tables repaired.
    pub fn judge_for(&self, beatmap: &Beatmap) -> JudgeProperty {
        let mut judge = if self.use_chart_difficulty {
            JudgeProperty::from_overall_difficulty(beatmap.metadata().overall_difficulty)
        } else {
            self.judge.clone()
        };
        judge.validate();
        judge
    }
}
