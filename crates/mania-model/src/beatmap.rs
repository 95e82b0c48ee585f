use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::key_mode::KeyMode;
use crate::note::NoteSpec;
use crate::timing::{TimingMap, TimingPoint};

/// Descriptive chart data that does not affect judgment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatmapMetadata {
    pub title: String,
    pub artist: String,
    /// Difficulty name
    pub version: String,
    /// Audio file name, relative to the chart file
    pub audio_file: String,
    /// osu! OverallDifficulty (0-10)
    pub overall_difficulty: f64,
    /// osu! HPDrainRate (0-10)
    pub hp_drain_rate: f64,
    /// SHA-256 of the chart file (hex), empty when built in memory
    pub sha256: String,
}

/// Complete chart: key mode, timing points and notes.
///
/// Immutable once constructed. Notes are kept sorted by (start time, lane),
/// deserialized charts included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "BeatmapFields")]
pub struct Beatmap {
    key_mode: KeyMode,
    timing_points: Vec<TimingPoint>,
    notes: Vec<NoteSpec>,
    metadata: BeatmapMetadata,
}

#[derive(Deserialize)]
struct BeatmapFields {
    key_mode: KeyMode,
    timing_points: Vec<TimingPoint>,
    notes: Vec<NoteSpec>,
    metadata: BeatmapMetadata,
}

impl From<BeatmapFields> for Beatmap {
    fn from(f: BeatmapFields) -> Self {
        Beatmap::new(f.key_mode, f.timing_points, f.notes, f.metadata)
    }
}

impl Beatmap {
    pub fn new(
        key_mode: KeyMode,
        timing_points: Vec<TimingPoint>,
        mut notes: Vec<NoteSpec>,
        metadata: BeatmapMetadata,
    ) -> Self {
        notes.sort_by_key(|n| (n.time_us, n.lane));
        Self {
            key_mode,
            timing_points,
            notes,
            metadata,
        }
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    pub fn lane_count(&self) -> usize {
        self.key_mode.lane_count()
    }

    pub fn timing_points(&self) -> &[TimingPoint] {
        &self.timing_points
    }

    pub fn notes(&self) -> &[NoteSpec] {
        &self.notes
    }

    pub fn metadata(&self) -> &BeatmapMetadata {
        &self.metadata
    }

    pub fn timing_map(&self) -> TimingMap {
        TimingMap::new(&self.timing_points)
    }

    /// Time of the last judged instant (latest note start or hold end).
    pub fn last_note_time_us(&self) -> Option<i64> {
        self.notes.iter().map(|n| n.end_time_us).max()
    }

    /// Number of judgment events a full play produces (taps once, holds twice).
    pub fn judgment_event_count(&self) -> usize {
        self.notes
            .iter()
            .map(|n| if n.is_hold() { 2 } else { 1 })
            .sum()
    }

    /// Check the chart invariants the judgment core relies on.
    ///
    /// Rejects non-ascending or invalid timing points, notes outside the
    /// key mode's lanes, holds that do not end after they start, and notes of
    /// one lane that overlap.
    pub fn validate(&self) -> Result<()> {
        for (i, tp) in self.timing_points.iter().enumerate() {
            ensure!(
                tp.bpm.is_finite() && tp.bpm > 0.0,
                "timing point {i} at {}us has invalid bpm {}",
                tp.time_us,
                tp.bpm
            );
            ensure!(
                tp.scroll_speed.is_finite() && tp.scroll_speed > 0.0,
                "timing point {i} at {}us has invalid scroll speed {}",
                tp.time_us,
                tp.scroll_speed
            );
            if i > 0 && tp.time_us <= self.timing_points[i - 1].time_us {
                bail!(
                    "timing points not ascending: point {i} at {}us follows {}us",
                    tp.time_us,
                    self.timing_points[i - 1].time_us
                );
            }
        }

        let lanes = self.lane_count();
        let mut lane_end: Vec<Option<i64>> = vec![None; lanes];
        for (i, note) in self.notes.iter().enumerate() {
            ensure!(
                note.lane < lanes,
                "note {i} at {}us uses lane {} but {} has {lanes} lanes",
                note.time_us,
                note.lane,
                self.key_mode.name()
            );
            if note.is_hold() {
                ensure!(
                    note.end_time_us > note.time_us,
                    "hold note {i} in lane {} ends at {}us, not after its start {}us",
                    note.lane,
                    note.end_time_us,
                    note.time_us
                );
            } else {
                ensure!(
                    note.end_time_us == note.time_us,
                    "tap note {i} in lane {} has an end time",
                    note.lane
                );
            }
            if let Some(prev_end) = lane_end[note.lane]
                && note.time_us <= prev_end
            {
                bail!(
                    "note {i} in lane {} at {}us overlaps the previous note ending at {prev_end}us",
                    note.lane,
                    note.time_us
                );
            }
            lane_end[note.lane] = Some(note.end_time_us);
        }
        Ok(())
    }
}
