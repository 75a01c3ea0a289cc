use crate::domain::models::Soundscape;
use crate::infrastructure::error::InfraError;
use std::sync::Mutex;

/// Looping audio track backing each selectable soundscape.
pub fn stream_url(soundscape: Soundscape) -> Option<&'static str> {
    match soundscape {
        Soundscape::None => None,
        Soundscape::Rain => Some("https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3"),
        Soundscape::Lofi => Some("https://www.soundhelix.com/examples/mp3/SoundHelix-Song-2.mp3"),
        Soundscape::Cafe => Some("https://www.soundhelix.com/examples/mp3/SoundHelix-Song-3.mp3"),
        Soundscape::WhiteNoise => {
            Some("https://www.soundhelix.com/examples/mp3/SoundHelix-Song-4.mp3")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmbientStream {
    pub soundscape: Soundscape,
    pub volume: f32,
}

/// Owns the single ambient audio stream. Starting a stream while one is
/// active tears the previous one down first; at most one stream exists at
/// any time.
pub trait SoundscapePlayer: Send + Sync {
    fn start(&self, soundscape: Soundscape, volume: f32) -> Result<(), InfraError>;
    fn stop(&self) -> Result<(), InfraError>;
    fn current(&self) -> Result<Option<AmbientStream>, InfraError>;
}

#[derive(Debug, Default)]
pub struct InMemorySoundscapePlayer {
    stream: Mutex<Option<AmbientStream>>,
}

impl InMemorySoundscapePlayer {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<AmbientStream>>, InfraError> {
        self.stream
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("soundscape lock poisoned: {error}")))
    }
}

impl SoundscapePlayer for InMemorySoundscapePlayer {
    fn start(&self, soundscape: Soundscape, volume: f32) -> Result<(), InfraError> {
        let mut stream = self.lock()?;
        if soundscape == Soundscape::None {
            *stream = None;
            return Ok(());
        }
        *stream = Some(AmbientStream {
            soundscape,
            volume: volume.clamp(0.0, 1.0),
        });
        Ok(())
    }

    fn stop(&self) -> Result<(), InfraError> {
        let mut stream = self.lock()?;
        *stream = None;
        Ok(())
    }

    fn current(&self) -> Result<Option<AmbientStream>, InfraError> {
        Ok(self.lock()?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_replaces_the_active_stream() {
        let player = InMemorySoundscapePlayer::default();
        player.start(Soundscape::Rain, 0.5).expect("start rain");
        player.start(Soundscape::Lofi, 0.8).expect("switch to lofi");

        let current = player.current().expect("current").expect("stream active");
        assert_eq!(current.soundscape, Soundscape::Lofi);
        assert_eq!(current.volume, 0.8);
    }

    #[test]
    fn starting_none_stops_playback() {
        let player = InMemorySoundscapePlayer::default();
        player.start(Soundscape::Cafe, 0.4).expect("start cafe");
        player.start(Soundscape::None, 0.4).expect("switch to none");
        assert_eq!(player.current().expect("current"), None);
    }

    #[test]
    fn volume_is_clamped_to_unit_range() {
        let player = InMemorySoundscapePlayer::default();
        player.start(Soundscape::Rain, 2.5).expect("start");
        let current = player.current().expect("current").expect("stream active");
        assert_eq!(current.volume, 1.0);

        player.start(Soundscape::Rain, -1.0).expect("restart");
        let current = player.current().expect("current").expect("stream active");
        assert_eq!(current.volume, 0.0);
    }

    #[test]
    fn every_audible_soundscape_has_a_stream_url() {
        assert_eq!(stream_url(Soundscape::None), None);
        for soundscape in [
            Soundscape::Lofi,
            Soundscape::Rain,
            Soundscape::Cafe,
            Soundscape::WhiteNoise,
        ] {
            assert!(stream_url(soundscape).is_some());
        }
    }
}
