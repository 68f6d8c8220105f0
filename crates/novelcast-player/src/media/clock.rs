//! Headless media element driven by a virtual clock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{MediaElement, MediaError, PlayableSource};

/// Bitrate of the provider's MP3 output (32 kbit/s mono).
pub const DEFAULT_BITRATE_BPS: u64 = 32_000;

#[derive(Debug)]
struct ClockState {
    source: Option<PlayableSource>,
    position: Duration,
    paused: bool,
    ended: bool,
    bitrate_bps: u64,
}

/// Media element that "plays" by advancing a clock.
///
/// Duration is estimated from the byte length at a fixed bitrate. Clones
/// share state, so a driver can keep one handle to call [`Self::advance`]
/// while the buffer controller owns another.
#[derive(Debug, Clone)]
pub struct ClockMedia {
    state: Arc<Mutex<ClockState>>,
}

impl Default for ClockMedia {
    fn default() -> Self {
        Self::new(DEFAULT_BITRATE_BPS)
    }
}

impl ClockMedia {
    pub fn new(bitrate_bps: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                source: None,
                position: Duration::ZERO,
                paused: true,
                ended: false,
                bitrate_bps: bitrate_bps.max(1),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock forward. Returns `true` if playback reached the end.
    pub fn advance(&self, elapsed: Duration) -> bool {
        let mut state = self.lock();
        if state.paused || state.ended {
            return false;
        }
        let Some(duration) = state.duration() else {
            return false;
        };
        state.position = (state.position + elapsed).min(duration);
        if state.position >= duration {
            state.paused = true;
            state.ended = true;
            return true;
        }
        false
    }

    pub fn has_ended(&self) -> bool {
        self.lock().ended
    }

    pub fn source_id(&self) -> Option<u64> {
        self.lock().source.as_ref().map(PlayableSource::id)
    }
}

impl ClockState {
    fn duration(&self) -> Option<Duration> {
        let source = self.source.as_ref()?;
        let bits = u64::try_from(source.len())
            .unwrap_or(u64::MAX)
            .saturating_mul(8_000_000);
        Some(Duration::from_micros(bits / self.bitrate_bps))
    }
}

impl MediaElement for ClockMedia {
    fn load(&mut self, source: PlayableSource) {
        let mut state = self.lock();
        state.source = Some(source);
        state.position = Duration::ZERO;
        state.paused = true;
        state.ended = false;
    }

    fn unload(&mut self) {
        let mut state = self.lock();
        state.source = None;
        state.position = Duration::ZERO;
        state.paused = true;
        state.ended = false;
    }

    fn play(&mut self) -> Result<(), MediaError> {
        let mut state = self.lock();
        if state.source.is_none() {
            return Err(MediaError::NoSource);
        }
        state.paused = false;
        state.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }

    fn position(&self) -> Duration {
        self.lock().position
    }

    fn seek(&mut self, position: Duration) {
        let mut state = self.lock();
        let limit = state.duration().unwrap_or(Duration::ZERO);
        state.position = position.min(limit);
        state.ended = false;
    }

    fn duration(&self) -> Option<Duration> {
        self.lock().duration()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn source(len: usize) -> PlayableSource {
        PlayableSource::new(Bytes::from(vec![0u8; len]))
    }

    #[test]
    fn duration_follows_bitrate() {
        let mut media = ClockMedia::new(8_000);
        assert_eq!(media.duration(), None);
        media.load(source(1_500));
        assert_eq!(media.duration(), Some(Duration::from_millis(1_500)));
    }

    #[test]
    fn advance_stops_at_end() {
        let mut media = ClockMedia::new(8_000);
        media.load(source(1_000));
        assert!(!media.advance(Duration::from_millis(500)));
        assert_eq!(media.position(), Duration::ZERO);

        media.play().unwrap();
        assert!(!media.advance(Duration::from_millis(600)));
        assert!(media.advance(Duration::from_millis(600)));
        assert_eq!(media.position(), Duration::from_secs(1));
        assert!(media.is_paused());
        assert!(media.has_ended());
    }

    #[test]
    fn play_without_source_fails() {
        let mut media = ClockMedia::default();
        assert_eq!(media.play(), Err(MediaError::NoSource));
    }

    #[test]
    fn clones_share_the_clock() {
        let mut media = ClockMedia::new(8_000);
        let driver = media.clone();
        media.load(source(2_000));
        media.play().unwrap();
        driver.advance(Duration::from_millis(250));
        assert_eq!(media.position(), Duration::from_millis(250));
    }
}
