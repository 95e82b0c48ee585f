use serde::{Deserialize, Serialize};

/// Tempo assumed when a chart carries no timing points.
pub const DEFAULT_BPM: f64 = 120.0;

const US_PER_MINUTE: f64 = 60_000_000.0;

/// A tempo / scroll-speed change at an absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingPoint {
    /// Absolute time in microseconds
    pub time_us: i64,
    /// Beats per minute from this point on
    pub bpm: f64,
    /// Scroll-speed multiplier (1.0 = normal)
    pub scroll_speed: f64,
}

impl TimingPoint {
    pub fn new(time_us: i64, bpm: f64) -> Self {
        Self {
            time_us,
            bpm,
            scroll_speed: 1.0,
        }
    }

    pub fn with_scroll_speed(mut self, scroll_speed: f64) -> Self {
        self.scroll_speed = scroll_speed;
        self
    }

    /// Duration of one beat in microseconds.
    pub fn beat_length_us(&self) -> f64 {
        US_PER_MINUTE / self.bpm
    }
}

/// Beat ↔ time conversion over an ascending list of timing points.
///
/// Beat 0 is at time 0. Before the first timing point the first point's tempo
/// is extrapolated backwards; after the last point its tempo continues forever.
#[derive(Debug, Clone)]
pub struct TimingMap {
    points: Vec<TimingPoint>,
    /// Cumulative beat position at each point
    beats_at: Vec<f64>,
}

impl TimingMap {
    /// Build a map from timing points sorted ascending by time.
    pub fn new(points: &[TimingPoint]) -> Self {
        let mut beats_at = Vec::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            let beat = if i == 0 {
                point.time_us as f64 * point.bpm / US_PER_MINUTE
            } else {
                let prev = &points[i - 1];
                beats_at[i - 1] + (point.time_us - prev.time_us) as f64 * prev.bpm / US_PER_MINUTE
            };
            beats_at.push(beat);
        }
        Self {
            points: points.to_vec(),
            beats_at,
        }
    }

    pub fn points(&self) -> &[TimingPoint] {
        &self.points
    }

    /// The timing point in effect at `time_us`: the latest whose time ≤ `time_us`.
    pub fn active_at(&self, time_us: i64) -> Option<&TimingPoint> {
        let idx = self.points.partition_point(|p| p.time_us <= time_us);
        if idx == 0 {
            None
        } else {
            Some(&self.points[idx - 1])
        }
    }

    pub fn bpm_at(&self, time_us: i64) -> f64 {
        match self.active_at(time_us) {
            Some(p) => p.bpm,
            None => self.points.first().map_or(DEFAULT_BPM, |p| p.bpm),
        }
    }

    pub fn scroll_speed_at(&self, time_us: i64) -> f64 {
        self.active_at(time_us).map_or(1.0, |p| p.scroll_speed)
    }

    /// Convert a beat position to absolute microseconds.
    pub fn beat_to_time_us(&self, beat: f64) -> i64 {
        if self.points.is_empty() {
            return (beat * US_PER_MINUTE / DEFAULT_BPM).round() as i64;
        }
        let idx = self.beats_at.partition_point(|&b| b <= beat).saturating_sub(1);
        let point = &self.points[idx];
        let delta_beats = beat - self.beats_at[idx];
        point.time_us + (delta_beats * point.beat_length_us()).round() as i64
    }

    /// Convert absolute microseconds to a beat position.
    pub fn time_to_beat(&self, time_us: i64) -> f64 {
        if self.points.is_empty() {
            return time_us as f64 * DEFAULT_BPM / US_PER_MINUTE;
        }
        let idx = self
            .points
            .partition_point(|p| p.time_us <= time_us)
            .saturating_sub(1);
        let point = &self.points[idx];
        self.beats_at[idx] + (time_us - point.time_us) as f64 * point.bpm / US_PER_MINUTE
    }
}
