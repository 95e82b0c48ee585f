use std::sync::Arc;

use anyhow::Result;

use crate::driver::PlaybackDriver;
use crate::position::{PlaybackPublisher, PlaybackReader, PlaybackSnapshot, playback_channel};
use crate::wall_clock::WallClock;

/// Typical mixer period: 512 frames at 44.1kHz.
pub const DEFAULT_BUFFER_US: i64 = 11_610;

#[derive(Debug, Clone, Copy)]
struct Stall {
    at_position_us: i64,
    duration_us: i64,
}

/// Deterministic playback backend.
///
/// Plays a silent track of `length_us` against a wall clock and publishes the
/// position in whole buffer steps, the way a real mixer callback does.
/// Injected stalls hold the position for a stretch of wall time.
pub struct SimulatedPlayback {
    wall: Arc<dyn WallClock>,
    publisher: PlaybackPublisher,
    length_us: i64,
    buffer_us: i64,
    latency_us: i64,
    stalls: Vec<Stall>,
    started_at: Option<i64>,
    paused_at: Option<i64>,
    paused_total_us: i64,
}

impl SimulatedPlayback {
    pub fn new(wall: Arc<dyn WallClock>, length_us: i64) -> (Self, PlaybackReader) {
        let (publisher, reader) = playback_channel();
        (
            Self {
                wall,
                publisher,
                length_us: length_us.max(0),
                buffer_us: DEFAULT_BUFFER_US,
                latency_us: 0,
                stalls: Vec::new(),
                started_at: None,
                paused_at: None,
                paused_total_us: 0,
            },
            reader,
        )
    }

    pub fn with_buffer_us(mut self, buffer_us: i64) -> Self {
        self.buffer_us = buffer_us.max(1);
        self
    }

    pub fn with_latency_us(mut self, latency_us: i64) -> Self {
        self.latency_us = latency_us.max(0);
        self
    }

    /// Hold the position at `at_position_us` for `duration_us` of wall time.
    pub fn with_stall(mut self, at_position_us: i64, duration_us: i64) -> Self {
        self.stalls.push(Stall {
            at_position_us,
            duration_us: duration_us.max(0),
        });
        self.stalls.sort_by_key(|s| s.at_position_us);
        self
    }

    pub fn length_us(&self) -> i64 {
        self.length_us
    }

    /// Track position for `played_us` of wall time spent playing.
    fn position_for(&self, played_us: i64) -> i64 {
        let mut pos = played_us;
        for stall in &self.stalls {
            if pos <= stall.at_position_us {
                break;
            }
            pos = if pos < stall.at_position_us + stall.duration_us {
                stall.at_position_us
            } else {
                pos - stall.duration_us
            };
        }
        (pos / self.buffer_us * self.buffer_us).min(self.length_us)
    }
}

impl PlaybackDriver for SimulatedPlayback {
    fn start(&mut self) -> Result<()> {
        self.started_at = Some(self.wall.now_us());
        self.paused_at = None;
        self.paused_total_us = 0;
        self.publisher.publish(PlaybackSnapshot {
            position_us: 0,
            latency_us: self.latency_us,
            finished: false,
        });
        log::debug!(
            "simulated playback started: {}us track, {}us buffers, {}us latency",
            self.length_us,
            self.buffer_us,
            self.latency_us
        );
        Ok(())
    }

    fn poll(&mut self) {
        let Some(started) = self.started_at else {
            return;
        };
        let now = self.paused_at.unwrap_or_else(|| self.wall.now_us());
        let played = (now - started - self.paused_total_us).max(0);
        let position_us = self.position_for(played);
        let finished = position_us >= self.length_us;
        let last = self.publisher.last();
        if last.position_us != position_us || last.finished != finished {
            self.publisher.publish(PlaybackSnapshot {
                position_us,
                latency_us: self.latency_us,
                finished,
            });
        }
    }

    fn pause(&mut self) {
        if self.started_at.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(self.wall.now_us());
        }
    }

    fn resume(&mut self) {
        if let Some(at) = self.paused_at.take() {
            self.paused_total_us += self.wall.now_us() - at;
        }
    }

    fn is_finished(&self) -> bool {
        self.publisher.last().finished
    }
}
