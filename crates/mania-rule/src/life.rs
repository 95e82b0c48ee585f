use serde::{Deserialize, Serialize};

use crate::JUDGMENT_COUNT;
use crate::judge::Judgment;

/// Life gauge policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeProperty {
    /// Starting value
    pub init: f32,
    /// Upper bound
    pub max: f32,
    /// Change per judgment: [Perfect, Great, Good, Miss]
    pub values: [f32; JUDGMENT_COUNT],
    /// Whether an empty gauge ends the play
    pub fail_on_empty: bool,
}

impl Default for LifeProperty {
    fn default() -> Self {
        Self {
            init: 100.0,
            max: 100.0,
            values: [1.0, 0.5, 0.0, -8.0],
            fail_on_empty: true,
        }
    }
}

impl LifeProperty {
    /// Clamp the gauge bounds into a usable range.
    pub fn validate(&mut self) {
        if !self.max.is_finite() || self.max <= 0.0 {
            self.max = Self::default().max;
        }
        if !self.init.is_finite() {
            self.init = self.max;
        }
        self.init = self.init.clamp(f32::MIN_POSITIVE, self.max);
        for v in &mut self.values {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
    }
}

/// Running life value.
///
/// With `fail_on_empty`, a gauge that reaches zero is dead and never recovers.
#[derive(Debug, Clone)]
pub struct LifeGauge {
    value: f32,
    property: LifeProperty,
}

impl LifeGauge {
    pub fn new(property: &LifeProperty) -> Self {
        Self {
            value: property.init.clamp(0.0, property.max),
            property: property.clone(),
        }
    }

    pub fn update(&mut self, judgment: Judgment) {
        let inc = self.property.values[judgment.index()];
        self.set_value(self.value + inc);
    }

    pub fn set_value(&mut self, value: f32) {
        if self.is_dead() {
            return;
        }
        self.value = value.clamp(0.0, self.property.max);
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_dead(&self) -> bool {
        self.property.fail_on_empty && self.value <= 0.0
    }
}
