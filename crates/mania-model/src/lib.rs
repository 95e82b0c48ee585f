// Chart data model: key modes, notes, timing points, beatmap and the osu!mania decoder

mod beatmap;
mod builder;
mod key_mode;
mod note;
mod osu;
mod timing;

pub use beatmap::{Beatmap, BeatmapMetadata};
pub use builder::BeatmapBuilder;
pub use key_mode::KeyMode;
pub use note::{NoteKind, NoteSpec};
pub use osu::OsuDecoder;
pub use timing::{TimingMap, TimingPoint};

/// Microseconds per millisecond.
pub const US_PER_MS: i64 = 1_000;

/// Convert a millisecond value (possibly fractional) to microseconds.
pub fn ms_to_us(ms: f64) -> i64 {
    (ms * US_PER_MS as f64).round() as i64
}
