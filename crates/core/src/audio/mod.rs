use std::sync::{Arc, Mutex, MutexGuard};

use crate::{BeatlaneError, Clock, Result};

#[derive(Debug, Default)]
struct PlaybackState {
    seconds: f64,
    playing: bool,
}

/// Shared, thread-safe playback position of an external media player.
///
/// The audio side advances it (typically from its output callback) and the
/// scheduler side samples it through [`AudioClock`].
#[derive(Debug, Clone, Default)]
pub struct MediaPosition {
    shared: Arc<Mutex<PlaybackState>>,
}

impl MediaPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&self) -> Result<()> {
        self.lock()?.playing = true;
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        self.lock()?.playing = false;
        Ok(())
    }

    pub fn is_playing(&self) -> Result<bool> {
        Ok(self.lock()?.playing)
    }

    /// Seeks to an absolute position.
    pub fn seek(&self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            return Err(BeatlaneError::InvalidInput("seek position must be finite"));
        }
        self.lock()?.seconds = seconds.max(0.0);
        Ok(())
    }

    /// Records that `frames` samples were played at `sample_rate`. Ignored
    /// while paused.
    pub fn advance_frames(&self, frames: usize, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(BeatlaneError::InvalidInput("sample rate must be non-zero"));
        }
        let mut state = self.lock()?;
        if state.playing {
            state.seconds += frames as f64 / sample_rate as f64;
        }
        Ok(())
    }

    pub fn position(&self) -> Result<f64> {
        Ok(self.lock()?.seconds)
    }

    fn lock(&self) -> Result<MutexGuard<'_, PlaybackState>> {
        self.shared
            .lock()
            .map_err(|_| BeatlaneError::Poisoned("media position"))
    }
}

/// [`Clock`] backed by a [`MediaPosition`].
#[derive(Debug, Clone)]
pub struct AudioClock {
    media: MediaPosition,
}

impl AudioClock {
    pub fn new(media: MediaPosition) -> Self {
        Self { media }
    }

    pub fn media(&self) -> &MediaPosition {
        &self.media
    }
}

impl Clock for AudioClock {
    /// A poisoned position reads as zero; the time-front then holds its
    /// previous value instead of running backwards.
    fn now(&self) -> f64 {
        self.media.position().unwrap_or_else(|err| {
            tracing::warn!(%err, "audio clock unavailable");
            0.0
        })
    }
}
