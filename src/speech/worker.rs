//! The unit of work ([`SynthesisJob`]), the cooperative [`CancelFlag`] and
//! the [`SpeechWorker`] sum type the dispatcher starts.
//!
//! # Cancellation caveat
//!
//! Cancellation is checked between stages only. Once audio playback or a
//! blocking engine `speak` call has started it runs to completion; raising
//! the flag merely keeps later stages from starting.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::cloud::CloudSpeechWorker;
use super::local::LocalSpeechWorker;
use super::SpeechError;

// ---------------------------------------------------------------------------
// SynthesisJob
// ---------------------------------------------------------------------------

/// Immutable payload handed from the dispatcher to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisJob {
    text: String,
    option_id: String,
}

impl SynthesisJob {
    pub fn new(text: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            option_id: option_id.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Language code (cloud) or engine voice id (local).
    pub fn option_id(&self) -> &str {
        &self.option_id
    }
}

// ---------------------------------------------------------------------------
// CancelFlag
// ---------------------------------------------------------------------------

/// Shared stop flag between the dispatcher and one running worker.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// SpeechWorker
// ---------------------------------------------------------------------------

/// One of the two backend workers, ready to run a single job.
pub enum SpeechWorker {
    Cloud(CloudSpeechWorker),
    Local(LocalSpeechWorker),
}

impl SpeechWorker {
    pub fn backend(&self) -> &'static str {
        match self {
            SpeechWorker::Cloud(_) => "cloud",
            SpeechWorker::Local(_) => "local",
        }
    }

    /// Run the job to completion, including cleanup.
    ///
    /// Returns once every resource the job acquired has been released.
    pub async fn run(self, cancel: CancelFlag) -> Result<(), SpeechError> {
        match self {
            SpeechWorker::Cloud(worker) => worker.run(&cancel).await,
            SpeechWorker::Local(worker) => worker.run(cancel).await,
        }
    }
}
