use anyhow::Result;

/// Playback backend driven by the host loop.
///
/// Implementations publish their position through a [`crate::PlaybackPublisher`];
/// the [`crate::AudioClock`] only reads it.
pub trait PlaybackDriver {
    /// Begin playback from the start of the track.
    fn start(&mut self) -> Result<()>;

    /// Publish the current playback position. Called once per host tick.
    fn poll(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Whether the track has played to its end.
    fn is_finished(&self) -> bool;
}
