//! Speech dispatch: turns a UI "read" request into exactly one running
//! worker and exactly one terminal event.
//!
//! # Architecture
//!
//! ```text
//! startup / Refresh ──▶ SpeechSession::detect ──▶ SpeechSession {mode, catalog}
//!                                                        │
//! ReaderApp ──submit(text, option)──▶ SpeechDispatcher ──┘
//!     ▲                                   │  Idle ─▶ Busy
//!     │                                   ▼
//!     │                        runtime.spawn(SpeechWorker::run)
//!     │                                   │
//!     └──── poll() each frame ◀── mpsc ◀──┘  Finished | Error(msg)  ─▶ Idle
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use image_to_speech::config::AppConfig;
//! use image_to_speech::dispatch::{SpeechBackends, SpeechDispatcher, SpeechSession};
//! use image_to_speech::speech::{ConnectivityProbe, SystemTtsFactory};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let config = AppConfig::default();
//! let probe = ConnectivityProbe::from_config(&config.speech);
//! let session = SpeechSession::detect(&probe, Arc::new(SystemTtsFactory)).await;
//!
//! let mut dispatcher = SpeechDispatcher::new(
//!     session,
//!     SpeechBackends::from_config(&config.speech),
//!     tokio::runtime::Handle::current(),
//! );
//! dispatcher.submit("Hello world", "English").unwrap();
//! let event = dispatcher.next_event().await;
//! # }
//! ```

pub mod dispatcher;
pub mod session;
pub mod state;
pub mod validate;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use dispatcher::{SpeechBackends, SpeechDispatcher};
pub use session::SpeechSession;
pub use state::{DispatchEvent, DispatchState};
pub use validate::{is_speakable, validate_text, SubmitError};
