use serde::{Deserialize, Serialize};

use crate::judge::Judgment;

/// Symmetric timing-window bounds in microseconds.
///
/// Bounds are inclusive: `|offset| <= perfect_us` is Perfect, otherwise
/// `<= great_us` is Great, otherwise `<= good_us` is Good, anything wider is
/// outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeWindowTable {
    pub perfect_us: i64,
    pub great_us: i64,
    pub good_us: i64,
}

impl JudgeWindowTable {
    pub const fn new(perfect_us: i64, great_us: i64, good_us: i64) -> Self {
        Self {
            perfect_us,
            great_us,
            good_us,
        }
    }

    /// Judgment for a signed offset, or `None` outside the widest window.
    pub fn judge(&self, offset_us: i64) -> Option<Judgment> {
        let abs = offset_us.unsigned_abs();
        if abs <= self.perfect_us as u64 {
            Some(Judgment::Perfect)
        } else if abs <= self.great_us as u64 {
            Some(Judgment::Great)
        } else if abs <= self.good_us as u64 {
            Some(Judgment::Good)
        } else {
            None
        }
    }

    pub fn contains(&self, offset_us: i64) -> bool {
        offset_us.unsigned_abs() <= self.good_us as u64
    }

    /// Bounds are non-negative and widen monotonically.
    pub fn is_valid(&self) -> bool {
        0 <= self.perfect_us && self.perfect_us <= self.great_us && self.great_us <= self.good_us
    }
}

/// Timing-window policy for one play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JudgeProperty {
    /// Windows for taps and hold heads
    pub note: JudgeWindowTable,
    /// Windows for hold releases around the hold's end time
    pub hold_end: JudgeWindowTable,
    /// A release this far before the end (beyond `hold_end`) still scores Good
    pub early_release_grace_us: i64,
}

impl Default for JudgeProperty {
    fn default() -> Self {
        Self {
            note: JudgeWindowTable::new(16_000, 40_000, 100_000),
            hold_end: JudgeWindowTable::new(16_000, 40_000, 80_000),
            early_release_grace_us: 150_000,
        }
    }
}

impl JudgeProperty {
    /// Windows derived from an osu! OverallDifficulty value (clamped to 0..=10).
    ///
    /// Perfect is fixed at 16ms; Great `64 - 3·OD`, Good `97 - 3·OD` and the
    /// early-release grace `151 - 3·OD` milliseconds. Releases use the same
    /// table as presses.
    pub fn from_overall_difficulty(od: f64) -> Self {
        let od = if od.is_finite() { od.clamp(0.0, 10.0) } else { 5.0 };
        let ms = |v: f64| (v * 1_000.0).round() as i64;
        let table = JudgeWindowTable::new(16_000, ms(64.0 - 3.0 * od), ms(97.0 - 3.0 * od));
        Self {
            note: table,
            hold_end: table,
            early_release_grace_us: ms(151.0 - 3.0 * od),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.note.is_valid()
            && self.hold_end.is_valid()
            && self.early_release_grace_us >= self.hold_end.good_us
    }

    /// Replace inconsistent tables with the defaults.
    pub fn validate(&mut self) {
        let defaults = Self::default();
        if !self.note.is_valid() {
            log::warn!("invalid note judge windows {:?}, using defaults", self.note);
            self.note = defaults.note;
        }
        if !self.hold_end.is_valid() {
            log::warn!(
                "invalid hold end judge windows {:?}, using defaults",
                self.hold_end
            );
            self.hold_end = defaults.hold_end;
        }
        if self.early_release_grace_us < self.hold_end.good_us {
            self.early_release_grace_us = self.hold_end.good_us;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive() {
        let t = JudgeProperty::default().note;
        assert_eq!(t.judge(0), Some(Judgment::Perfect));
        assert_eq!(t.judge(16_000), Some(Judgment::Perfect));
        assert_eq!(t.judge(-16_000), Some(Judgment::Perfect));
        assert_eq!(t.judge(16_001), Some(Judgment::Great));
        assert_eq!(t.judge(40_000), Some(Judgment::Great));
        assert_eq!(t.judge(-40_000), Some(Judgment::Great));
        assert_eq!(t.judge(40_001), Some(Judgment::Good));
        assert_eq!(t.judge(100_000), Some(Judgment::Good));
        assert_eq!(t.judge(100_001), None);
        assert_eq!(t.judge(i64::MIN), None);
        assert!(t.contains(-100_000));
        assert!(!t.contains(-100_001));
    }

    #[test]
    fn overall_difficulty_windows() {
        let p = JudgeProperty::from_overall_difficulty(8.0);
        assert_eq!(p.note, JudgeWindowTable::new(16_000, 40_000, 73_000));
        assert_eq!(p.early_release_grace_us, 127_000);
        assert!(p.is_valid());

        let easiest = JudgeProperty::from_overall_difficulty(-3.0);
        assert_eq!(easiest.note.good_us, 97_000);
        let hardest = JudgeProperty::from_overall_difficulty(42.0);
        assert_eq!(hardest.note.great_us, 34_000);
        assert!(hardest.is_valid());
    }

    #[test]
    fn validate_repairs_tables() {
        let mut p = JudgeProperty {
            note: JudgeWindowTable::new(50_000, 20_000, 100_000),
            hold_end: JudgeWindowTable::new(-1, 20_000, 30_000),
            early_release_grace_us: 0,
        };
        assert!(!p.is_valid());
        p.validate();
        assert_eq!(p.note, JudgeProperty::default().note);
        assert_eq!(p.hold_end, JudgeProperty::default().hold_end);
        assert_eq!(p.early_release_grace_us, p.hold_end.good_us);
        assert!(p.is_valid());
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&JudgeProperty::default()).unwrap();
        assert!(json.contains("\"holdEnd\""));
        assert!(json.contains("\"perfectUs\":16000"));
        let back: JudgeProperty = serde_json::from_str(&json).unwrap();
        assert_eq!(back, JudgeProperty::default());
    }
}
