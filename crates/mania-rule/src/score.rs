//! Scoring accumulator: score, combo, accuracy and life.

use serde::{Deserialize, Serialize};

use crate::JUDGMENT_COUNT;
use crate::judge::{JudgeEventKind, Judgment, JudgmentResult};
use crate::life::{LifeGauge, LifeProperty};

/// How hold notes feed the combo counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldComboPolicy {
    /// Head and tail each count as one combo step
    HeadAndTail,
    /// Only the tail counts; a missed head still breaks the combo
    TailOnly,
}

/// Score weighting policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoreProperty {
    /// Base points: [Perfect, Great, Good, Miss]
    pub points: [u32; JUDGMENT_COUNT],
    /// Accuracy weight of each judgment in 0.0..=1.0
    pub accuracy_weights: [f64; JUDGMENT_COUNT],
    /// Score bonus per combo step (0.005 = +0.5%)
    pub combo_bonus: f64,
    /// Combo steps beyond this no longer raise the bonus
    pub combo_bonus_cap: u32,
    pub hold_combo: HoldComboPolicy,
}

impl Default for ScoreProperty {
    fn default() -> Self {
        Self {
            points: [300, 200, 100, 0],
            accuracy_weights: [1.0, 2.0 / 3.0, 1.0 / 3.0, 0.0],
            combo_bonus: 0.005,
            combo_bonus_cap: 100,
            hold_combo: HoldComboPolicy::HeadAndTail,
        }
    }
}

impl ScoreProperty {
    pub fn validate(&mut self) {
        for w in &mut self.accuracy_weights {
            *w = if w.is_finite() { w.clamp(0.0, 1.0) } else { 0.0 };
        }
        if !self.combo_bonus.is_finite() || self.combo_bonus < 0.0 {
            self.combo_bonus = 0.0;
        }
    }

    /// Points for a judgment given the combo before it.
    pub fn points_for(&self, judgment: Judgment, combo_before: u32) -> u64 {
        let base = self.points[judgment.index()] as f64;
        let steps = combo_before.min(self.combo_bonus_cap) as f64;
        (base * (1.0 + steps * self.combo_bonus)).round() as u64
    }
}

/// Live scoring values after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshot {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    /// Percent, 100.0 before any judgment
    pub accuracy: f64,
    pub life: f32,
    /// Judgment counts: [Perfect, Great, Good, Miss]
    pub counts: [u32; JUDGMENT_COUNT],
}

impl ScoreSnapshot {
    pub fn judged(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn count(&self, judgment: Judgment) -> u32 {
        self.counts[judgment.index()]
    }
}

#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    property: ScoreProperty,
    life: LifeGauge,
    score: u64,
    combo: u32,
    max_combo: u32,
    counts: [u32; JUDGMENT_COUNT],
    weight_sum: f64,
}

impl ScoreAccumulator {
    pub fn new(property: &ScoreProperty, life: &LifeProperty) -> Self {
        Self {
            property: property.clone(),
            life: LifeGauge::new(life),
            score: 0,
            combo: 0,
            max_combo: 0,
            counts: [0; JUDGMENT_COUNT],
            weight_sum: 0.0,
        }
    }

    /// Fold one judgment into the running totals.
    pub fn apply(&mut self, result: &JudgmentResult) {
        let j = result.judgment;
        self.score += self.property.points_for(j, self.combo);
        self.counts[j.index()] += 1;
        self.weight_sum += self.property.accuracy_weights[j.index()];

        if j.is_miss() {
            self.combo = 0;
        } else if !(result.kind == JudgeEventKind::Head
            && self.property.hold_combo == HoldComboPolicy::TailOnly)
        {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }
        self.life.update(j);
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn accuracy(&self) -> f64 {
        let judged: u32 = self.counts.iter().sum();
        if judged == 0 {
            100.0
        } else {
            self.weight_sum / judged as f64 * 100.0
        }
    }

    /// Life gauge is empty and the play fails on empty life.
    pub fn is_failed(&self) -> bool {
        self.life.is_dead()
    }

    pub fn snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            score: self.score,
            combo: self.combo,
            max_combo: self.max_combo,
            accuracy: self.accuracy(),
            life: self.life.value(),
            counts: self.counts,
        }
    }
}
