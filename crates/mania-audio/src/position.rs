//! Single-writer playback position snapshot.
//!
//! The audio thread publishes `{position, latency, finished}`; the game thread
//! reads a consistent copy without locking. Writes bump a sequence counter to
//! an odd value, store the fields, then bump it to the next even value; a
//! reader retries while the counter is odd or changed under it.

use std::hint;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering, fence};

/// Position reported before the backend's first update.
pub const NOT_STARTED: i64 = i64::MIN;

/// A consistent copy of the backend's last report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    /// Playback position of the track in microseconds, or [`NOT_STARTED`]
    pub position_us: i64,
    /// Output latency estimate in microseconds
    pub latency_us: i64,
    /// The track has played to its end
    pub finished: bool,
}

impl PlaybackSnapshot {
    pub fn is_started(&self) -> bool {
        self.position_us != NOT_STARTED
    }
}

#[derive(Debug)]
struct Shared {
    seq: AtomicU64,
    position_us: AtomicI64,
    latency_us: AtomicI64,
    finished: AtomicBool,
}

/// Create a connected publisher / reader pair.
pub fn playback_channel() -> (PlaybackPublisher, PlaybackReader) {
    let shared = Arc::new(Shared {
        seq: AtomicU64::new(0),
        position_us: AtomicI64::new(NOT_STARTED),
        latency_us: AtomicI64::new(0),
        finished: AtomicBool::new(false),
    });
    (
        PlaybackPublisher {
            shared: Arc::clone(&shared),
            last: PlaybackSnapshot {
                position_us: NOT_STARTED,
                latency_us: 0,
                finished: false,
            },
        },
        PlaybackReader { shared },
    )
}

/// Writing side, owned by the audio backend. Not `Clone`: one writer only.
#[derive(Debug)]
pub struct PlaybackPublisher {
    shared: Arc<Shared>,
    last: PlaybackSnapshot,
}

impl PlaybackPublisher {
    pub fn publish(&mut self, snapshot: PlaybackSnapshot) {
        let s = &self.shared;
        let seq = s.seq.load(Ordering::Relaxed);
        s.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        s.position_us.store(snapshot.position_us, Ordering::Relaxed);
        s.latency_us.store(snapshot.latency_us, Ordering::Relaxed);
        s.finished.store(snapshot.finished, Ordering::Relaxed);
        s.seq.store(seq.wrapping_add(2), Ordering::Release);
        self.last = snapshot;
    }

    pub fn report_position(&mut self, position_us: i64) {
        self.publish(PlaybackSnapshot {
            position_us,
            ..self.last
        });
    }

    pub fn set_latency(&mut self, latency_us: i64) {
        self.publish(PlaybackSnapshot {
            latency_us,
            ..self.last
        });
    }

    pub fn mark_finished(&mut self) {
        self.publish(PlaybackSnapshot {
            finished: true,
            ..self.last
        });
    }

    pub fn last(&self) -> PlaybackSnapshot {
        self.last
    }
}

/// Reading side, owned by the clock.
#[derive(Debug, Clone)]
pub struct PlaybackReader {
    shared: Arc<Shared>,
}

impl PlaybackReader {
    pub fn read(&self) -> PlaybackSnapshot {
        let s = &self.shared;
        loop {
            let before = s.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                hint::spin_loop();
                continue;
            }
            let snapshot = PlaybackSnapshot {
                position_us: s.position_us.load(Ordering::Relaxed),
                latency_us: s.latency_us.load(Ordering::Relaxed),
                finished: s.finished.load(Ordering::Relaxed),
            };
            fence(Ordering::Acquire);
            if s.seq.load(Ordering::Relaxed) == before {
                return snapshot;
            }
        }
    }
}
