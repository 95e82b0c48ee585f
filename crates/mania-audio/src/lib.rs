// Song-time clock over an observed audio playback position, plus playback drivers

mod clock;
mod driver;
mod position;
mod simulated;
mod wall_clock;

#[cfg(feature = "kira")]
mod kira_backend;

pub use clock::{AudioClock, ClockSample};
pub use driver::PlaybackDriver;
pub use position::{NOT_STARTED, PlaybackPublisher, PlaybackReader, PlaybackSnapshot, playback_channel};
pub use simulated::SimulatedPlayback;
pub use wall_clock::{ManualClock, SystemClock, WallClock};

#[cfg(feature = "kira")]
pub use kira_backend::KiraPlayback;
