//! [`SpeechDispatcher`]: single-flight job submission and terminal-event
//! delivery back to the UI thread.
//!
//! # Job flow
//!
//! ```text
//! submit(text, option)          (UI thread, never blocks)
//!   ├─ validate_text / resolve option ──Err──▶ SubmitError (no transition)
//!   └─ runtime.spawn(supervisor) ─▶ Busy
//!         └─ tokio::spawn(worker.run(cancel))
//!               └─ Ok | Err | JoinError(panic) ─▶ WorkerEvent (exactly once)
//!
//! poll() / next_event()         (UI thread)
//!   └─ WorkerEvent ─▶ DispatchEvent::{Finished, Error} ─▶ Idle
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::config::SpeechConfig;
use crate::speech::{
    AudioPlayer, CancelFlag, CloudSpeechWorker, CloudSynthesizer, EngineFactory,
    GoogleTranslateTts, LocalSpeechWorker, Mode, RodioPlayer, SpeechError, SpeechWorker,
    SynthesisJob, SystemTtsFactory, VoiceCatalog,
};

use super::session::SpeechSession;
use super::state::{DispatchEvent, DispatchState};
use super::validate::{validate_text, SubmitError};

// ---------------------------------------------------------------------------
// SpeechBackends
// ---------------------------------------------------------------------------

/// Collaborators and settings every job is built from.
pub struct SpeechBackends {
    pub synthesizer: Arc<dyn CloudSynthesizer>,
    pub player: Arc<dyn AudioPlayer>,
    pub engines: Arc<dyn EngineFactory>,
    /// Directory the cloud worker creates its temp audio file in.
    pub temp_dir: PathBuf,
    pub temp_prefix: String,
    pub rate_wpm: u32,
}

impl SpeechBackends {
    /// Production backends: Google Translate TTS, rodio, and the host engine.
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            synthesizer: Arc::new(GoogleTranslateTts::from_config(config)),
            player: Arc::new(RodioPlayer),
            engines: Arc::new(SystemTtsFactory),
            temp_dir: std::env::temp_dir(),
            temp_prefix: config.temp_audio_prefix.clone(),
            rate_wpm: config.speech_rate_wpm,
        }
    }

    fn worker_for(&self, mode: Mode, job: SynthesisJob) -> SpeechWorker {
        match mode {
            Mode::Online => SpeechWorker::Cloud(CloudSpeechWorker::new(
                job,
                Arc::clone(&self.synthesizer),
                Arc::clone(&self.player),
                self.temp_dir.clone(),
                self.temp_prefix.clone(),
            )),
            Mode::Offline => SpeechWorker::Local(LocalSpeechWorker::new(
                job,
                Arc::clone(&self.engines),
                self.rate_wpm,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Worker bookkeeping
// ---------------------------------------------------------------------------

/// The one in-flight job.
struct WorkerHandle {
    job_id: u64,
    cancel: CancelFlag,
    backend: &'static str,
}

/// Sent by a job's supervisor task exactly once.
struct WorkerEvent {
    job_id: u64,
    outcome: Result<(), SpeechError>,
}

// ---------------------------------------------------------------------------
// SpeechDispatcher
// ---------------------------------------------------------------------------

/// Owns the session and at most one running worker.
///
/// Lives on the UI thread. Workers run on `runtime`; their outcomes come
/// back over a channel that the UI drains with [`poll`](Self::poll) each
/// frame (or awaits with [`next_event`](Self::next_event)).
pub struct SpeechDispatcher {
    session: SpeechSession,
    backends: SpeechBackends,
    runtime: Handle,
    state: DispatchState,
    current: Option<WorkerHandle>,
    next_job_id: u64,
    events_tx: mpsc::Sender<WorkerEvent>,
    events_rx: mpsc::Receiver<WorkerEvent>,
}

impl SpeechDispatcher {
    pub fn new(session: SpeechSession, backends: SpeechBackends, runtime: Handle) -> Self {
        let (events_tx, events_rx) = mpsc::channel(4);
        Self {
            session,
            backends,
            runtime,
            state: DispatchState::Idle,
            current: None,
            next_job_id: 0,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn mode(&self) -> Mode {
        self.session.mode()
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        self.session.catalog()
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Start reading `text` with the option named `option_name`.
    ///
    /// On `Err` nothing was started and the state is unchanged. On `Ok` the
    /// dispatcher is Busy until the job's terminal event has been taken via
    /// [`poll`](Self::poll) or [`next_event`](Self::next_event).
    pub fn submit(&mut self, text: &str, option_name: &str) -> Result<(), SubmitError> {
        if self.current.is_some() {
            log::warn!("dispatcher: submit refused, a job is already running");
            return Err(SubmitError::Busy);
        }

        validate_text(text)?;

        let catalog = self.session.catalog();
        if !catalog.speech_available() {
            return Err(SubmitError::NoVoices);
        }
        if option_name.is_empty() {
            return Err(SubmitError::NoOptionSelected);
        }
        let option_id = catalog
            .resolve(option_name)
            .ok_or_else(|| SubmitError::UnknownOption(option_name.to_string()))?;

        let job = SynthesisJob::new(text, option_id);
        let worker = self.backends.worker_for(self.session.mode(), job);
        let backend = worker.backend();

        self.next_job_id += 1;
        let job_id = self.next_job_id;
        let cancel = CancelFlag::new();

        log::info!("dispatcher: starting {backend} job {job_id} ({option_name} = {option_id})");

        let worker_cancel = cancel.clone();
        let events_tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            // The inner task isolates panics so the event is still sent.
            let outcome = match tokio::spawn(worker.run(worker_cancel)).await {
                Ok(outcome) => outcome,
                Err(e) => Err(SpeechError::from(e)),
            };
            if events_tx.send(WorkerEvent { job_id, outcome }).await.is_err() {
                log::warn!("dispatcher: dropped before job {job_id} finished");
            }
        });

        self.current = Some(WorkerHandle {
            job_id,
            cancel,
            backend,
        });
        self.state = DispatchState::Busy;
        Ok(())
    }

    /// Ask the running job to stop.
    ///
    /// Best effort: stages not yet started are skipped, but audio that is
    /// already playing runs to the end. The job still delivers its terminal
    /// event. Returns `false` when nothing is running.
    pub fn stop(&self) -> bool {
        match &self.current {
            Some(handle) => {
                log::info!(
                    "dispatcher: stop requested for {} job {}",
                    handle.backend,
                    handle.job_id
                );
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Install a freshly detected session. Refused while a job runs.
    pub fn replace_session(&mut self, session: SpeechSession) -> Result<(), SubmitError> {
        if self.current.is_some() {
            return Err(SubmitError::Busy);
        }
        log::info!(
            "dispatcher: session replaced ({} -> {})",
            self.session.mode().label(),
            session.mode().label()
        );
        self.session = session;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Terminal events
    // -----------------------------------------------------------------------

    /// Non-blocking: take the running job's terminal event if it has arrived.
    pub fn poll(&mut self) -> Option<DispatchEvent> {
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(event) = self.complete(event) {
                return Some(event);
            }
        }
        None
    }

    /// Wait for the running job's terminal event. Returns `None` at once
    /// when nothing is running.
    pub async fn next_event(&mut self) -> Option<DispatchEvent> {
        while self.current.is_some() {
            let event = self.events_rx.recv().await?;
            if let Some(event) = self.complete(event) {
                return Some(event);
            }
        }
        None
    }

    fn complete(&mut self, event: WorkerEvent) -> Option<DispatchEvent> {
        match &self.current {
            Some(handle) if handle.job_id == event.job_id => {}
            _ => {
                log::debug!("dispatcher: ignoring event for stale job {}", event.job_id);
                return None;
            }
        }

        let handle = self.current.take()?;
        self.state = DispatchState::Idle;

        Some(match event.outcome {
            Ok(()) => {
                log::info!("dispatcher: {} job {} finished", handle.backend, handle.job_id);
                DispatchEvent::Finished
            }
            Err(e) => {
                log::error!("dispatcher: {} job {} failed: {e}", handle.backend, handle.job_id);
                DispatchEvent::Error(e.to_string())
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
