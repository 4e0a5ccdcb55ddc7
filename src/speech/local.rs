//! Offline backend: the [`LocalEngine`] abstraction over the host speech
//! engine, its `tts`-crate implementation, and the [`LocalSpeechWorker`].
//!
//! An engine instance is created per job, on the worker's blocking thread,
//! and stopped once its speech has ended. Engines therefore never cross
//! threads and need not be `Send`; only the factory does.
//!
//! Host engines queue speech and return immediately, so the worker waits in
//! [`LocalEngine::wait_until_done`]. When an engine can report neither the
//! end of an utterance nor whether it is speaking, the worker cannot know
//! when the speech ends and leaves it playing instead of stopping it.

use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use tts::{Tts, UtteranceId};

use super::catalog::SpeechOption;
use super::worker::{CancelFlag, SynthesisJob};
use super::SpeechError;

/// Rate the host engine's "normal" setting corresponds to.
const NORMAL_WPM: f32 = 200.0;
/// Interval between `is_speaking` polls while waiting for an utterance.
const SPEAK_POLL: Duration = Duration::from_millis(50);
/// How long a queued utterance may take to start before we stop watching it.
pub(crate) const SPEAK_START_TIMEOUT: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// LocalEngine / EngineFactory traits
// ---------------------------------------------------------------------------

/// How waiting for an utterance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechEnd {
    /// The engine reported the utterance finished.
    Done,
    /// The engine cannot tell; the utterance may still be playing.
    Unknown,
}

/// One instance of the host speech engine.
pub trait LocalEngine {
    /// Installed voices, as display name + engine voice id.
    fn voices(&self) -> Result<Vec<SpeechOption>, SpeechError>;

    fn set_voice(&mut self, voice_id: &str) -> Result<(), SpeechError>;

    fn set_rate_wpm(&mut self, wpm: u32) -> Result<(), SpeechError>;

    /// Queue `text`. Returns as soon as the engine has accepted it.
    fn speak(&mut self, text: &str) -> Result<(), SpeechError>;

    /// Block until the last queued utterance has been spoken.
    fn wait_until_done(&mut self) -> Result<SpeechEnd, SpeechError>;

    fn stop(&mut self) -> Result<(), SpeechError>;
}

/// Creates engine instances; shared by every job.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn LocalEngine>, SpeechError>;
}

// Compile-time assertion: Arc<dyn EngineFactory> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Arc<dyn EngineFactory>, _: Box<dyn LocalEngine>) {}
};

/// Poll `is_speaking` until an utterance has started and then finished.
///
/// Returns [`SpeechEnd::Unknown`] if speaking is never observed within
/// `start_timeout`.
pub(crate) fn wait_for_speech(
    mut is_speaking: impl FnMut() -> Result<bool, SpeechError>,
    start_timeout: Duration,
    poll: Duration,
) -> Result<SpeechEnd, SpeechError> {
    let queued_at = Instant::now();
    while !is_speaking()? {
        if queued_at.elapsed() >= start_timeout {
            log::warn!("local engine never reported speaking after {start_timeout:?}");
            return Ok(SpeechEnd::Unknown);
        }
        std::thread::sleep(poll);
    }
    while is_speaking()? {
        std::thread::sleep(poll);
    }
    Ok(SpeechEnd::Done)
}

// ---------------------------------------------------------------------------
// SystemTts
// ---------------------------------------------------------------------------

/// Host engine via the `tts` crate (SAPI / AVFoundation / Speech Dispatcher).
pub struct SystemTts {
    tts: Tts,
    /// Ids of finished utterances, once the end callback is registered.
    ended: Option<mpsc::Receiver<UtteranceId>>,
    pending: Option<UtteranceId>,
}

impl SystemTts {
    pub fn new() -> Result<Self, SpeechError> {
        let tts = Tts::default().map_err(|e| SpeechError::EngineInit(e.to_string()))?;
        Ok(Self {
            tts,
            ended: None,
            pending: None,
        })
    }

    fn watch_utterance_ends(&mut self) -> Result<(), SpeechError> {
        if self.ended.is_some() || !self.tts.supported_features().utterance_callbacks {
            return Ok(());
        }
        let (tx, rx) = mpsc::channel();
        self.tts
            .on_utterance_end(Some(Box::new(move |id| {
                let _ = tx.send(id);
            })))
            .map_err(engine_err)?;
        self.ended = Some(rx);
        Ok(())
    }
}

fn engine_err(e: tts::Error) -> SpeechError {
    SpeechError::Engine(e.to_string())
}

impl LocalEngine for SystemTts {
    fn voices(&self) -> Result<Vec<SpeechOption>, SpeechError> {
        let voices = self.tts.voices().map_err(engine_err)?;
        Ok(voices
            .into_iter()
            .map(|v| SpeechOption::new(v.name(), v.id()))
            .collect())
    }

    fn set_voice(&mut self, voice_id: &str) -> Result<(), SpeechError> {
        let voice = self
            .tts
            .voices()
            .map_err(engine_err)?
            .into_iter()
            .find(|v| v.id() == voice_id)
            .ok_or_else(|| SpeechError::Engine(format!("voice {voice_id:?} is not installed")))?;
        self.tts.set_voice(&voice).map_err(engine_err)?;
        Ok(())
    }

    fn set_rate_wpm(&mut self, wpm: u32) -> Result<(), SpeechError> {
        if !self.tts.supported_features().rate {
            log::debug!("local engine: rate control unsupported, keeping default");
            return Ok(());
        }
        let rate = engine_rate_for_wpm(
            wpm,
            self.tts.min_rate(),
            self.tts.normal_rate(),
            self.tts.max_rate(),
        );
        self.tts.set_rate(rate).map_err(engine_err)?;
        Ok(())
    }

    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        // Register before speaking so the end of this utterance is not missed.
        self.watch_utterance_ends()?;
        self.pending = self.tts.speak(text, false).map_err(engine_err)?;
        Ok(())
    }

    fn wait_until_done(&mut self) -> Result<SpeechEnd, SpeechError> {
        if let (Some(ended), Some(id)) = (&self.ended, self.pending.take()) {
            while let Ok(finished) = ended.recv() {
                if finished == id {
                    return Ok(SpeechEnd::Done);
                }
            }
            log::warn!("local engine dropped its end-of-utterance callback");
        }

        if self.tts.supported_features().is_speaking {
            let tts = &self.tts;
            return wait_for_speech(
                || tts.is_speaking().map_err(engine_err),
                SPEAK_START_TIMEOUT,
                SPEAK_POLL,
            );
        }

        log::warn!("local engine cannot report progress; not waiting for speech to end");
        Ok(SpeechEnd::Unknown)
    }

    fn stop(&mut self) -> Result<(), SpeechError> {
        self.tts.stop().map_err(engine_err)?;
        Ok(())
    }
}

/// Map words-per-minute onto an engine rate range.
///
/// 200 wpm is the engine's normal rate; 0 wpm maps to its minimum and
/// 400 wpm or more to its maximum, linearly in between.
pub(crate) fn engine_rate_for_wpm(wpm: u32, min: f32, normal: f32, max: f32) -> f32 {
    let wpm = wpm as f32;
    let rate = if wpm <= NORMAL_WPM {
        min + (normal - min) * (wpm / NORMAL_WPM)
    } else {
        normal + (max - normal) * ((wpm - NORMAL_WPM) / NORMAL_WPM)
    };
    rate.clamp(min, max)
}

/// Factory for [`SystemTts`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTtsFactory;

impl EngineFactory for SystemTtsFactory {
    fn create(&self) -> Result<Box<dyn LocalEngine>, SpeechError> {
        Ok(Box::new(SystemTts::new()?))
    }
}

// ---------------------------------------------------------------------------
// LocalSpeechWorker
// ---------------------------------------------------------------------------

/// Speaks one job through a freshly created engine instance.
pub struct LocalSpeechWorker {
    job: SynthesisJob,
    factory: Arc<dyn EngineFactory>,
    rate_wpm: u32,
}

impl LocalSpeechWorker {
    pub fn new(job: SynthesisJob, factory: Arc<dyn EngineFactory>, rate_wpm: u32) -> Self {
        Self {
            job,
            factory,
            rate_wpm,
        }
    }

    /// Run the job on the blocking thread pool.
    pub async fn run(self, cancel: CancelFlag) -> Result<(), SpeechError> {
        tokio::task::spawn_blocking(move || self.run_blocking(&cancel)).await?
    }

    fn run_blocking(&self, cancel: &CancelFlag) -> Result<(), SpeechError> {
        if cancel.is_cancelled() {
            log::info!("local worker: stop requested before start");
            return Ok(());
        }

        log::info!("Starting local speech synthesis");

        let outcome = self.factory.create().and_then(|mut engine| {
            let outcome = self.speak_with(engine.as_mut(), cancel);
            if matches!(outcome, Ok(SpeechEnd::Unknown)) {
                // Stopping now would cut off speech that may still be playing.
                log::debug!("local worker: leaving queued speech to the engine");
            } else if let Err(e) = engine.stop() {
                log::debug!("local worker: ignoring engine stop error: {e}");
            }
            outcome.map(|_| ())
        });

        match &outcome {
            Ok(()) => log::info!("Local speech synthesis completed"),
            Err(e) => log::error!("Error in local speech worker: {e}"),
        }
        outcome
    }

    fn speak_with(
        &self,
        engine: &mut dyn LocalEngine,
        cancel: &CancelFlag,
    ) -> Result<SpeechEnd, SpeechError> {
        let voice_id = self.job.option_id();
        if !voice_id.is_empty() {
            engine.set_voice(voice_id)?;
        }
        engine.set_rate_wpm(self.rate_wpm)?;

        if cancel.is_cancelled() {
            log::info!("local worker: stop requested before speaking");
            return Ok(SpeechEnd::Done);
        }
        engine.speak(self.job.text())?;
        engine.wait_until_done()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
