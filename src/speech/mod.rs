//! Speech backends: connectivity detection, voice catalogs and the two
//! synthesis workers.
//!
//! # Architecture
//!
//! ```text
//! ConnectivityProbe ──▶ Mode ──▶ VoiceCatalog (cloud table | local voices)
//!                                   │
//!                     SynthesisJob {text, option_id}
//!                                   │
//!               ┌───────────────────┴───────────────────┐
//!               ▼                                       ▼
//!       CloudSpeechWorker                       LocalSpeechWorker
//!   CloudSynthesizer → TempAudioFile        EngineFactory → LocalEngine
//!        → AudioPlayer → cleanup             → speak → wait_until_done → stop
//! ```
//!
//! Every worker returns a single `Result<(), SpeechError>`; the dispatcher
//! turns that into exactly one terminal event.

pub mod artifact;
pub mod catalog;
pub mod cloud;
pub mod connectivity;
pub mod local;
pub mod playback;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use artifact::TempAudioFile;
pub use catalog::{cloud_languages, local_voices, SpeechOption, VoiceCatalog};
pub use cloud::{CloudSpeechWorker, CloudSynthesizer, GoogleTranslateTts};
pub use connectivity::ConnectivityProbe;
pub use local::{
    EngineFactory, LocalEngine, LocalSpeechWorker, SpeechEnd, SystemTts, SystemTtsFactory,
};
pub use playback::{AudioPlayer, RodioPlayer};
pub use worker::{CancelFlag, SpeechWorker, SynthesisJob};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Which backend serves this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Cloud synthesis is reachable.
    Online,
    /// Only the host speech engine is available.
    Offline,
}

impl Mode {
    pub fn from_reachability(online: bool) -> Self {
        if online {
            Mode::Online
        } else {
            Mode::Offline
        }
    }

    /// Short label for logs and the status line.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Online => "ONLINE",
            Mode::Offline => "OFFLINE",
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Everything that can go wrong while a worker synthesizes or plays a job.
///
/// The `Display` text is shown verbatim in the "Speech Error" dialog.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// HTTP transport or connection error talking to the cloud service.
    #[error("cloud speech request failed: {0}")]
    Network(String),

    /// The cloud request did not complete within the configured timeout.
    #[error("cloud speech request timed out")]
    Timeout,

    /// The cloud service answered with a non-success status.
    #[error("cloud speech service returned HTTP {0}")]
    HttpStatus(u16),

    /// The cloud service answered successfully but sent no audio.
    #[error("cloud speech service returned no audio")]
    EmptyAudio,

    /// Reading or writing the temporary audio file failed.
    #[error("audio file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The audio output device or decoder failed.
    #[error("audio playback failed: {0}")]
    Playback(String),

    /// The host speech engine could not be created.
    #[error("local speech engine unavailable: {0}")]
    EngineInit(String),

    /// The host speech engine rejected a command.
    #[error("local speech engine error: {0}")]
    Engine(String),

    /// The worker task panicked or was aborted.
    #[error("speech worker terminated unexpectedly: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SpeechError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SpeechError::Timeout
        } else if let Some(status) = e.status() {
            SpeechError::HttpStatus(status.as_u16())
        } else {
            SpeechError::Network(e.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for SpeechError {
    fn from(e: tokio::task::JoinError) -> Self {
        SpeechError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_reachability() {
        assert_eq!(Mode::from_reachability(true), Mode::Online);
        assert_eq!(Mode::from_reachability(false), Mode::Offline);
    }

    #[test]
    fn error_messages_are_human_readable() {
        assert_eq!(
            SpeechError::HttpStatus(503).to_string(),
            "cloud speech service returned HTTP 503"
        );
        assert_eq!(
            SpeechError::Network("connection refused".into()).to_string(),
            "cloud speech request failed: connection refused"
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert_eq!(SpeechError::from(io).to_string(), "audio file I/O failed: read-only");
    }
}
