//! Autoplay input generation.
//!
//! Produces the Down/Up stream a perfect player would send for a beatmap,
//! optionally jittered (seeded, reproducible) and with notes left unplayed.

use mania_model::Beatmap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::event::{InputEvent, KeyEdge};

/// How long autoplay keeps a tap key down.
pub const TAP_PRESS_US: i64 = 80_000;

#[derive(Debug, Clone)]
pub struct Autoplay {
    jitter_us: i64,
    seed: u64,
    miss_every: Option<usize>,
}

impl Default for Autoplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Autoplay {
    /// Exact timing, every note played.
    pub fn new() -> Self {
        Self {
            jitter_us: 0,
            seed: 0,
            miss_every: None,
        }
    }

    /// Offset every edge by a uniform value in `[-jitter_us, jitter_us]`.
    pub fn with_jitter(mut self, jitter_us: i64, seed: u64) -> Self {
        self.jitter_us = jitter_us.max(0);
        self.seed = seed;
        self
    }

    /// Leave every `n`-th note (1-based, chart order) unplayed. `0` disables.
    pub fn with_miss_every(mut self, n: usize) -> Self {
        self.miss_every = (n > 0).then_some(n);
        self
    }

    /// Generate events sorted by time; at equal times releases come first.
    ///
    /// Within a lane every press is strictly after the previous release, so the
    /// stream never presses an already-held key.
    pub fn generate(&self, beatmap: &Beatmap) -> Vec<InputEvent> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let jitter = |rng: &mut StdRng| {
            if self.jitter_us == 0 {
                0
            } else {
                rng.gen_range(-self.jitter_us..=self.jitter_us)
            }
        };

        let notes = beatmap.notes();
        let mut lane_floor = vec![i64::MIN; beatmap.lane_count()];
        let mut events = Vec::with_capacity(notes.len() * 2);

        for (idx, note) in notes.iter().enumerate() {
            if self.miss_every.is_some_and(|n| (idx + 1) % n == 0) {
                continue;
            }
            let lane = note.lane;
            let next_start = notes[idx + 1..]
                .iter()
                .find(|n| n.lane == lane)
                .map(|n| n.time_us);

            let down = (note.time_us + jitter(&mut rng)).max(lane_floor[lane]);
            let up = if note.is_hold() {
                (note.end_time_us + jitter(&mut rng)).max(down + 1)
            } else {
                let press = match next_start {
                    Some(next) => TAP_PRESS_US.min((next - down) / 2),
                    None => TAP_PRESS_US,
                };
                down + press.max(1)
            };
            lane_floor[lane] = up + 1;

            events.push(InputEvent::down(lane, down));
            events.push(InputEvent::up(lane, up));
        }

        events.sort_by_key(|e| (e.time_us, e.edge == KeyEdge::Down, e.lane));
        log::debug!(
            "autoplay generated {} events (jitter {}us)",
            events.len(),
            self.jitter_us
        );
        events
    }
}
