//! Audio file playback via `rodio`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStream, Sink};

use super::SpeechError;

/// Blocking playback of an encoded audio file.
///
/// Implementations block the calling thread until playback ends, so callers
/// run them on `spawn_blocking`. Playback cannot be interrupted once started.
pub trait AudioPlayer: Send + Sync {
    fn play_file(&self, path: &Path) -> Result<(), SpeechError>;
}

// Compile-time assertion: Box<dyn AudioPlayer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioPlayer>) {}
};

/// Plays files on the default output device.
///
/// A fresh output stream is opened per call because `OutputStream` is not
/// `Send` and must live on the thread that plays.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioPlayer;

impl AudioPlayer for RodioPlayer {
    fn play_file(&self, path: &Path) -> Result<(), SpeechError> {
        let (_stream, handle) =
            OutputStream::try_default().map_err(|e| SpeechError::Playback(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| SpeechError::Playback(e.to_string()))?;

        let file = File::open(path)?;
        let source =
            Decoder::new(BufReader::new(file)).map_err(|e| SpeechError::Playback(e.to_string()))?;

        log::info!("Playing audio...");
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}
