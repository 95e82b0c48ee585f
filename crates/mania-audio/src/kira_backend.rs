//! kira streaming playback.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kira::sound::streaming::{StreamingSoundData, StreamingSoundHandle};
use kira::sound::{FromFileError, PlaybackState};
use kira::{AudioManager, AudioManagerSettings, DefaultBackend, Tween};

use crate::driver::PlaybackDriver;
use crate::position::{PlaybackPublisher, PlaybackReader, PlaybackSnapshot, playback_channel};

/// Streams a song file through kira and publishes its playback position.
///
/// kira reports no device latency, so the estimate is supplied by the caller.
pub struct KiraPlayback {
    manager: AudioManager<DefaultBackend>,
    path: PathBuf,
    pending: Option<StreamingSoundData<FromFileError>>,
    handle: Option<StreamingSoundHandle<FromFileError>>,
    publisher: PlaybackPublisher,
    latency_us: i64,
}

impl KiraPlayback {
    pub fn open(path: &Path, latency_us: i64) -> Result<(Self, PlaybackReader)> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .context("Failed to create audio manager")?;
        let data = StreamingSoundData::from_file(path)
            .with_context(|| format!("Failed to load song: {}", path.display()))?;
        let (publisher, reader) = playback_channel();
        Ok((
            Self {
                manager,
                path: path.to_path_buf(),
                pending: Some(data),
                handle: None,
                publisher,
                latency_us: latency_us.max(0),
            },
            reader,
        ))
    }
}

impl PlaybackDriver for KiraPlayback {
    fn start(&mut self) -> Result<()> {
        let data = match self.pending.take() {
            Some(data) => data,
            None => StreamingSoundData::from_file(&self.path)
                .with_context(|| format!("Failed to reload song: {}", self.path.display()))?,
        };
        let handle = self
            .manager
            .play(data)
            .with_context(|| format!("Failed to play song: {}", self.path.display()))?;
        self.handle = Some(handle);
        self.publisher.publish(PlaybackSnapshot {
            position_us: 0,
            latency_us: self.latency_us,
            finished: false,
        });
        log::info!("playing {}", self.path.display());
        Ok(())
    }

    fn poll(&mut self) {
        let Some(handle) = &self.handle else {
            return;
        };
        let position_us = (handle.position() * 1_000_000.0).round() as i64;
        let finished = handle.state() == PlaybackState::Stopped;
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
        if let Some(handle) = &mut self.handle {
            handle.pause(Tween::default());
        }
    }

    fn resume(&mut self) {
        if let Some(handle) = &mut self.handle {
            handle.resume(Tween::default());
        }
    }

    fn is_finished(&self) -> bool {
        self.publisher.last().finished
    }
}
