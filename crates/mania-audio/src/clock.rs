//! Audio clock.
//!
//! Song time = playback position − output latency + user offset. Between two
//! backend reports the position is interpolated with the wall clock from the
//! last report that advanced it:
//!
//! ```text
//! position(now) = p0 + (now − t0),   (t0, p0) = last re-anchor
//! ```
//!
//! Interpolation never runs further past the anchor than two of the backend's
//! observed report steps (at most the stall threshold), so a backend that stops
//! reporting cannot make song time run ahead of the audio. When the position
//! has not advanced for longer than `stall_threshold_us` the clock reports a
//! stall until the backend moves again. The returned song time never decreases
//! between [`AudioClock::reset`] calls.

use std::sync::Arc;

use crate::position::{NOT_STARTED, PlaybackReader};
use crate::wall_clock::WallClock;

/// Default stall threshold: no position change for 250ms.
pub const DEFAULT_STALL_THRESHOLD_US: i64 = 250_000;
/// Interpolation limit before the backend's report step is known.
pub const DEFAULT_INTERPOLATION_CAP_US: i64 = 50_000;
const MIN_INTERPOLATION_CAP_US: i64 = 2_000;
/// Report steps interpolation may run ahead of the last report.
const INTERPOLATION_STEPS: i64 = 2;

/// One reading of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    /// Song time in microseconds
    pub time_us: i64,
    /// The backend has reported at least one position
    pub started: bool,
    /// The backend position has stopped advancing; `time_us` is frozen
    pub stalled: bool,
    /// The backend has played the whole track
    pub finished: bool,
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    wall_us: i64,
    position_us: i64,
}

pub struct AudioClock {
    wall: Arc<dyn WallClock>,
    reader: PlaybackReader,
    offset_us: i64,
    stall_threshold_us: i64,
    /// Position advance between the last two reports
    report_step_us: Option<i64>,
    anchor: Option<Anchor>,
    /// Backend position that predates the last reset and must not re-anchor
    stale_position: Option<i64>,
    latency_us: i64,
    last_time_us: i64,
    suspended_at: Option<i64>,
}

impl AudioClock {
    pub fn new(wall: Arc<dyn WallClock>, reader: PlaybackReader) -> Self {
        Self {
            wall,
            reader,
            offset_us: 0,
            stall_threshold_us: DEFAULT_STALL_THRESHOLD_US,
            report_step_us: None,
            anchor: None,
            stale_position: None,
            latency_us: 0,
            last_time_us: i64::MIN,
            suspended_at: None,
        }
    }

    pub fn with_offset_us(mut self, offset_us: i64) -> Self {
        self.offset_us = offset_us;
        self
    }

    pub fn with_stall_threshold_us(mut self, threshold_us: i64) -> Self {
        self.stall_threshold_us = threshold_us.max(1);
        self
    }

    pub fn offset_us(&self) -> i64 {
        self.offset_us
    }

    pub fn set_offset_us(&mut self, offset_us: i64) {
        self.offset_us = offset_us;
    }

    pub fn stall_threshold_us(&self) -> i64 {
        self.stall_threshold_us
    }

    /// How far song time may run past the last backend report.
    pub fn interpolation_cap_us(&self) -> i64 {
        let cap = self
            .report_step_us
            .map_or(DEFAULT_INTERPOLATION_CAP_US, |step| step * INTERPOLATION_STEPS);
        cap.clamp(MIN_INTERPOLATION_CAP_US, self.stall_threshold_us.max(MIN_INTERPOLATION_CAP_US))
    }

    pub fn wall_now_us(&self) -> i64 {
        self.wall.now_us()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }

    /// Read the current song time.
    pub fn sample(&mut self) -> ClockSample {
        let snapshot = self.reader.read();
        self.latency_us = snapshot.latency_us;

        if self.suspended_at.is_some() {
            return ClockSample {
                time_us: self.last_or(self.song_time(self.base_position())),
                started: self.anchor.is_some(),
                stalled: false,
                finished: snapshot.finished,
            };
        }

        let now = self.wall.now_us();
        let fresh = snapshot.position_us != NOT_STARTED
            && self.stale_position != Some(snapshot.position_us)
            && self
                .anchor
                .is_none_or(|a| a.position_us != snapshot.position_us);
        if fresh {
            if let Some(prev) = self.anchor
                && self.stale_position.is_none()
                && snapshot.position_us > prev.position_us
            {
                self.report_step_us = Some(snapshot.position_us - prev.position_us);
            }
            self.stale_position = None;
            self.anchor = Some(Anchor {
                wall_us: now,
                position_us: snapshot.position_us,
            });
        }

        let Some(anchor) = self.anchor else {
            let time_us = self.last_or(self.song_time(0));
            self.last_time_us = time_us;
            return ClockSample {
                time_us,
                started: false,
                stalled: false,
                finished: snapshot.finished,
            };
        };

        let elapsed = (now - anchor.wall_us).max(0);
        let stalled = !snapshot.finished && elapsed > self.stall_threshold_us;
        let interpolated = if snapshot.finished {
            elapsed
        } else {
            elapsed.min(self.interpolation_cap_us())
        };
        let time_us = self.song_time(anchor.position_us + interpolated).max(self.last_time_us);
        self.last_time_us = time_us;
        ClockSample {
            time_us,
            started: true,
            stalled,
            finished: snapshot.finished,
        }
    }

    /// Song time at a wall-clock instant, using the current anchor.
    ///
    /// Input capture uses this to timestamp key events taken between ticks.
    /// The result is not clamped to the last sampled time.
    pub fn time_at(&self, wall_us: i64) -> i64 {
        let Some(anchor) = self.anchor else {
            return self.song_time(0);
        };
        let delta = if let Some(suspended) = self.suspended_at {
            (wall_us.min(suspended) - anchor.wall_us).min(self.interpolation_cap_us())
        } else if self.reader.read().finished {
            wall_us - anchor.wall_us
        } else {
            (wall_us - anchor.wall_us).min(self.interpolation_cap_us())
        };
        self.song_time(anchor.position_us + delta)
    }

    /// Restart from `position_us` after an explicit seek or restart.
    ///
    /// Drops the monotonic floor; the position the backend reported before the
    /// seek is ignored until it reports a different one.
    pub fn reset(&mut self, position_us: i64) {
        let current = self.reader.read().position_us;
        self.stale_position = (current != NOT_STARTED).then_some(current);
        self.anchor = Some(Anchor {
            wall_us: self.wall.now_us(),
            position_us,
        });
        self.last_time_us = i64::MIN;
        self.suspended_at = None;
        log::debug!("audio clock reset to {position_us}us");
    }

    /// Stop the clock for a pause. Wall time spent suspended is neither
    /// interpolated nor counted towards a stall.
    pub fn suspend(&mut self) {
        if self.suspended_at.is_none() {
            self.suspended_at = Some(self.wall.now_us());
        }
    }

    pub fn resume(&mut self) {
        if let Some(at) = self.suspended_at.take()
            && let Some(anchor) = &mut self.anchor
        {
            anchor.wall_us += self.wall.now_us() - at;
        }
    }

    fn song_time(&self, position_us: i64) -> i64 {
        position_us - self.latency_us + self.offset_us
    }

    fn base_position(&self) -> i64 {
        match (self.anchor, self.suspended_at) {
            (Some(a), Some(at)) => {
                a.position_us + (at - a.wall_us).clamp(0, self.interpolation_cap_us())
            }
            (Some(a), None) => a.position_us,
            (None, _) => 0,
        }
    }

    fn last_or(&self, time_us: i64) -> i64 {
        time_us.max(self.last_time_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{PlaybackPublisher, playback_channel};
    use crate::wall_clock::ManualClock;

    fn setup() -> (ManualClock, PlaybackPublisher, AudioClock) {
        let wall = ManualClock::new(1_000_000);
        let (tx, rx) = playback_channel();
        let clock = AudioClock::new(Arc::new(wall.clone()), rx);
        (wall, tx, clock)
    }

    #[test]
    fn not_started_before_first_report() {
        let (wall, _tx, mut clock) = setup();
        let s = clock.sample();
        assert!(!s.started);
        assert!(!s.stalled);
        assert_eq!(s.time_us, 0);
        // Waiting for the backend is not a stall
        wall.advance(5_000_000);
        assert!(!clock.sample().stalled);
    }

    #[test]
    fn interpolates_between_reports() {
        let (wall, mut tx, mut clock) = setup();
        tx.report_position(0);
        assert_eq!(clock.sample().time_us, 0);
        wall.advance(3_000);
        assert_eq!(clock.sample().time_us, 3_000);
        wall.advance(7_000);
        assert_eq!(clock.sample().time_us, 10_000);
        // Fresh report re-anchors
        tx.report_position(11_610);
        assert_eq!(clock.sample().time_us, 11_610);
        wall.advance(1_000);
        assert_eq!(clock.sample().time_us, 12_610);
    }

    #[test]
    fn latency_and_offset_applied() {
        let (wall, mut tx, clock) = setup();
        let mut clock = clock.with_offset_us(-5_000);
        tx.set_latency(20_000);
        tx.report_position(100_000);
        assert_eq!(clock.sample().time_us, 75_000);
        wall.advance(1_000);
        assert_eq!(clock.sample().time_us, 76_000);
        assert_eq!(clock.time_at(wall.now_us() + 4_000), 80_000);
    }

    #[test]
    fn never_goes_backwards() {
        let (wall, mut tx, mut clock) = setup();
        tx.report_position(0);
        clock.sample();
        wall.advance(15_000);
        assert_eq!(clock.sample().time_us, 15_000);
        // Backend report lags the interpolated estimate
        tx.report_position(11_610);
        assert_eq!(clock.sample().time_us, 15_000);
        wall.advance(2_000);
        assert_eq!(clock.sample().time_us, 15_000);
        wall.advance(2_000);
        assert_eq!(clock.sample().time_us, 15_610);
    }

    #[test]
    fn freezes_on_stall_and_resumes_without_jump() {
        let (wall, mut tx, clock) = setup();
        let mut clock = clock.with_stall_threshold_us(100_000);
        // Reports every 10ms set a 20ms interpolation cap
        for pos in [480_000, 490_000, 500_000] {
            tx.report_position(pos);
            clock.sample();
            wall.advance(10_000);
        }
        assert_eq!(clock.interpolation_cap_us(), 20_000);
        assert_eq!(clock.sample().time_us, 510_000);
        wall.advance(10_000);
        assert_eq!(clock.sample().time_us, 520_000);

        // Backend silent: time holds at the cap long before the stall is flagged
        wall.advance(50_000);
        let s = clock.sample();
        assert!(!s.stalled);
        assert_eq!(s.time_us, 520_000);
        wall.advance(30_001);
        let s = clock.sample();
        assert!(s.stalled);
        assert_eq!(s.time_us, 520_000);
        wall.advance(2_000_000);
        assert_eq!(clock.sample().time_us, 520_000);

        // Backend resumes slightly after where it stopped
        tx.report_position(510_000);
        let s = clock.sample();
        assert!(!s.stalled);
        assert_eq!(s.time_us, 520_000);
        wall.advance(15_000);
        assert_eq!(clock.sample().time_us, 525_000);
    }

    #[test]
    fn silent_backend_does_not_advance_song_time_past_cap() {
        let (wall, mut tx, mut clock) = setup();
        tx.report_position(0);
        clock.sample();
        // First report: step unknown
        assert_eq!(clock.interpolation_cap_us(), DEFAULT_INTERPOLATION_CAP_US);
        wall.advance(11_610);
        tx.report_position(11_610);
        clock.sample();
        assert_eq!(clock.interpolation_cap_us(), 23_220);
        wall.advance(200_000);
        let s = clock.sample();
        assert!(!s.stalled);
        assert_eq!(s.time_us, 11_610 + 23_220);
        assert_eq!(clock.time_at(wall.now_us()), 11_610 + 23_220);
    }

    #[test]
    fn interpolation_cap_bounded_by_stall_threshold() {
        let (wall, mut tx, clock) = setup();
        let mut clock = clock.with_stall_threshold_us(30_000);
        tx.report_position(0);
        clock.sample();
        wall.advance(100_000);
        tx.report_position(100_000);
        clock.sample();
        assert_eq!(clock.interpolation_cap_us(), 30_000);
    }

    #[test]
    fn finished_track_keeps_running() {
        let (wall, mut tx, mut clock) = setup();
        tx.report_position(3_000_000);
        tx.mark_finished();
        clock.sample();
        wall.advance(1_000_000);
        let s = clock.sample();
        assert!(s.finished);
        assert!(!s.stalled);
        assert_eq!(s.time_us, 4_000_000);
    }

    #[test]
    fn suspend_is_not_a_stall() {
        let (wall, mut tx, mut clock) = setup();
        tx.report_position(0);
        clock.sample();
        wall.advance(10_000);
        clock.suspend();
        assert_eq!(clock.sample().time_us, 10_000);
        wall.advance(5_000_000);
        let s = clock.sample();
        assert!(!s.stalled);
        assert_eq!(s.time_us, 10_000);
        clock.resume();
        wall.advance(1_000);
        let s = clock.sample();
        assert!(!s.stalled);
        assert_eq!(s.time_us, 11_000);
    }

    #[test]
    fn reset_allows_seek_backwards() {
        let (wall, mut tx, mut clock) = setup();
        tx.report_position(5_000_000);
        assert_eq!(clock.sample().time_us, 5_000_000);
        clock.reset(0);
        // Pre-seek report is ignored
        assert_eq!(clock.sample().time_us, 0);
        wall.advance(10_000);
        assert_eq!(clock.sample().time_us, 10_000);
        tx.report_position(11_000);
        assert_eq!(clock.sample().time_us, 11_000);
    }

    #[test]
    fn time_at_past_instant() {
        let (wall, mut tx, mut clock) = setup();
        tx.report_position(200_000);
        clock.sample();
        let anchor_wall = wall.now_us();
        wall.advance(8_000);
        assert_eq!(clock.time_at(anchor_wall - 3_000), 197_000);
        assert_eq!(clock.time_at(anchor_wall + 5_000), 205_000);
    }
}
