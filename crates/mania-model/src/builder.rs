use crate::beatmap::{Beatmap, BeatmapMetadata};
use crate::key_mode::KeyMode;
use crate::note::NoteSpec;
use crate::timing::{TimingMap, TimingPoint};

/// Note position before tempo resolution.
#[derive(Debug, Clone, Copy)]
enum Position {
    Time(i64),
    Beat(f64),
}

#[derive(Debug, Clone, Copy)]
struct PendingNote {
    lane: usize,
    start: Position,
    end: Option<Position>,
}

/// Builds a [`Beatmap`] from beat-relative or absolute note positions.
///
/// Beat positions are resolved through the timing points at `build()`, so the
/// order of calls does not matter.
#[derive(Debug, Clone)]
pub struct BeatmapBuilder {
    key_mode: KeyMode,
    timing_points: Vec<TimingPoint>,
    notes: Vec<PendingNote>,
    metadata: BeatmapMetadata,
}

impl BeatmapBuilder {
    pub fn new(key_mode: KeyMode) -> Self {
        Self {
            key_mode,
            timing_points: Vec::new(),
            notes: Vec::new(),
            metadata: BeatmapMetadata::default(),
        }
    }

    pub fn metadata(mut self, metadata: BeatmapMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn timing_point(mut self, point: TimingPoint) -> Self {
        self.timing_points.push(point);
        self
    }

    pub fn tap(mut self, lane: usize, time_us: i64) -> Self {
        self.notes.push(PendingNote {
            lane,
            start: Position::Time(time_us),
            end: None,
        });
        self
    }

    pub fn hold(mut self, lane: usize, time_us: i64, end_time_us: i64) -> Self {
        self.notes.push(PendingNote {
            lane,
            start: Position::Time(time_us),
            end: Some(Position::Time(end_time_us)),
        });
        self
    }

    pub fn tap_at_beat(mut self, lane: usize, beat: f64) -> Self {
        self.notes.push(PendingNote {
            lane,
            start: Position::Beat(beat),
            end: None,
        });
        self
    }

    pub fn hold_at_beats(mut self, lane: usize, beat: f64, end_beat: f64) -> Self {
        self.notes.push(PendingNote {
            lane,
            start: Position::Beat(beat),
            end: Some(Position::Beat(end_beat)),
        });
        self
    }

    /// Resolve every position to absolute time and assemble the beatmap.
    ///
    /// Timing points are sorted by time; invariants are checked later by
    /// [`Beatmap::validate`].
    pub fn build(mut self) -> Beatmap {
        self.timing_points.sort_by_key(|p| p.time_us);
        let map = TimingMap::new(&self.timing_points);
        let resolve = |pos: Position| match pos {
            Position::Time(t) => t,
            Position::Beat(b) => map.beat_to_time_us(b),
        };
        let notes = self
            .notes
            .iter()
            .map(|n| match n.end {
                None => NoteSpec::tap(n.lane, resolve(n.start)),
                Some(end) => NoteSpec::hold(n.lane, resolve(n.start), resolve(end)),
            })
            .collect();
        Beatmap::new(self.key_mode, self.timing_points, notes, self.metadata)
    }
}
