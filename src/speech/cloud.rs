//! Cloud backend: [`CloudSynthesizer`] trait, the Google Translate TTS
//! implementation, and the [`CloudSpeechWorker`] that runs one job.
//!
//! # Job flow
//!
//! ```text
//! cancelled? ──yes──▶ Ok
//!     │
//! TempAudioFile::create_in   (unique <prefix>XXXXXX.mp3)
//!     │
//! synthesize ─▶ write ─▶ cancelled? ─▶ spawn_blocking(play_file)
//!     │
//! cleanup  (always; failures logged, never change the outcome)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SpeechConfig;

use super::artifact::TempAudioFile;
use super::playback::AudioPlayer;
use super::worker::{CancelFlag, SynthesisJob};
use super::SpeechError;

/// The endpoint rejects longer `q` values.
const MAX_CHUNK_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// CloudSynthesizer trait
// ---------------------------------------------------------------------------

/// Turns text into encoded audio via a network service.
///
/// Implementors must be `Send + Sync` so one instance can be shared by every
/// job behind an `Arc<dyn CloudSynthesizer>`.
#[async_trait]
pub trait CloudSynthesizer: Send + Sync {
    /// Synthesize `text` in language `lang` and return MP3 bytes.
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, SpeechError>;
}

// ---------------------------------------------------------------------------
// GoogleTranslateTts
// ---------------------------------------------------------------------------

/// Calls the public Google Translate `translate_tts` endpoint.
///
/// Text is split into chunks of at most 100 characters on word boundaries;
/// each chunk is one GET and the returned MP3 segments are concatenated.
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateTts {
    /// Build from config. Falls back to a default client if the builder
    /// fails.
    pub fn from_config(config: &SpeechConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.cloud_timeout())
            .user_agent("Mozilla/5.0 (image-to-speech)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.cloud_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CloudSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, SpeechError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        let url = format!("{}/translate_tts", self.base_url);
        let total = chunks.len().to_string();

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let textlen = chunk.chars().count().to_string();

            let response = self
                .client
                .get(&url)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", lang),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SpeechError::HttpStatus(status.as_u16()));
            }
            audio.extend_from_slice(&response.bytes().await?);
        }

        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(audio)
    }
}

/// Split `text` into whitespace-joined chunks of at most `max_chars`
/// characters. Words longer than `max_chars` are cut at char boundaries.
pub(crate) fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            chunks.extend(chars.chunks(max_chars).map(|piece| piece.iter().collect::<String>()));
            continue;
        }

        let joined_len = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };

        if joined_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = joined_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ---------------------------------------------------------------------------
// CloudSpeechWorker
// ---------------------------------------------------------------------------

/// Synthesizes one job in the cloud, saves it to a temp file and plays it.
pub struct CloudSpeechWorker {
    job: SynthesisJob,
    synthesizer: Arc<dyn CloudSynthesizer>,
    player: Arc<dyn AudioPlayer>,
    temp_dir: PathBuf,
    temp_prefix: String,
}

impl CloudSpeechWorker {
    pub fn new(
        job: SynthesisJob,
        synthesizer: Arc<dyn CloudSynthesizer>,
        player: Arc<dyn AudioPlayer>,
        temp_dir: PathBuf,
        temp_prefix: impl Into<String>,
    ) -> Self {
        Self {
            job,
            synthesizer,
            player,
            temp_dir,
            temp_prefix: temp_prefix.into(),
        }
    }

    /// Run the job. The temp file is deleted before this returns, whatever
    /// the outcome.
    pub async fn run(self, cancel: &CancelFlag) -> Result<(), SpeechError> {
        if cancel.is_cancelled() {
            log::info!("cloud worker: stop requested before start");
            return Ok(());
        }

        log::info!(
            "Starting cloud speech synthesis (lang: {})",
            self.job.option_id()
        );

        let outcome = match TempAudioFile::create_in(&self.temp_dir, &self.temp_prefix) {
            Ok(artifact) => {
                let outcome = self.synthesize_and_play(&artifact, cancel).await;
                let _ = artifact.cleanup();
                outcome
            }
            Err(e) => Err(SpeechError::from(e)),
        };

        match &outcome {
            Ok(()) => log::info!("Cloud speech synthesis completed"),
            Err(e) => log::error!("Error in cloud speech worker: {e}"),
        }
        outcome
    }

    async fn synthesize_and_play(
        &self,
        artifact: &TempAudioFile,
        cancel: &CancelFlag,
    ) -> Result<(), SpeechError> {
        let audio = self
            .synthesizer
            .synthesize(self.job.text(), self.job.option_id())
            .await?;
        artifact.write(&audio)?;

        if cancel.is_cancelled() {
            log::info!("cloud worker: stop requested before playback");
            return Ok(());
        }

        let player = Arc::clone(&self.player);
        let path = artifact.path().to_path_buf();
        tokio::task::spawn_blocking(move || player.play_file(&path)).await??;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
