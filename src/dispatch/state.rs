//! Dispatcher state machine and the terminal events a job produces.
//!
//! ```text
//! Idle ──submit accepted──▶ Busy
//! Busy ──Finished | Error──▶ Idle
//! ```

/// Whether a speech job is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    /// No job running; a new submission is accepted.
    #[default]
    Idle,

    /// Exactly one worker is running. Submissions are refused until it
    /// reports its terminal event.
    Busy,
}

impl DispatchState {
    /// The UI uses this to disable the Read control while busy.
    ///
    /// ```
    /// use image_to_speech::dispatch::DispatchState;
    ///
    /// assert!(!DispatchState::Idle.is_busy());
    /// assert!(DispatchState::Busy.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, DispatchState::Busy)
    }

    /// Short label for the status line.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchState::Idle => "Ready",
            DispatchState::Busy => "Reading...",
        }
    }
}

/// Terminal outcome of one job. Exactly one is delivered per accepted
/// submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// The job ran to completion (or was stopped cooperatively).
    Finished,
    /// The job failed; carries the message for the "Speech Error" dialog.
    Error(String),
}

impl DispatchEvent {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            DispatchEvent::Finished => None,
            DispatchEvent::Error(msg) => Some(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
