//! Application entry point for the Image-to-Speech Reader.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Probe connectivity once and build the speech session.
//! 5. Build the dispatcher with the production backends.
//! 6. Build the Tesseract OCR collaborator.
//! 7. Run [`eframe::run_native`], which blocks the main thread until the window
//!    is closed.
//! 8. Shut the runtime down without waiting for speech still in progress.

use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use image_to_speech::{
    app::ReaderApp,
    config::AppConfig,
    dispatch::{SpeechBackends, SpeechDispatcher, SpeechSession},
    ocr::TesseractCli,
    speech::{ConnectivityProbe, EngineFactory},
};

/// Grace period for background tasks once the window has closed.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let min_size = [config.ui.window_min_width, config.ui.window_min_height];
    let vp = egui::ViewportBuilder::default()
        .with_title("Image-to-Speech Reader")
        .with_inner_size(min_size)
        .with_min_inner_size(min_size);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Application starting");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. Tokio runtime (2 worker threads: speech job and background probes)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Session: mode is fixed until the user presses Refresh
    let backends = SpeechBackends::from_config(&config.speech);
    let engines: Arc<dyn EngineFactory> = Arc::clone(&backends.engines);
    let probe = ConnectivityProbe::from_config(&config.speech);
    let session = rt.block_on(SpeechSession::detect(&probe, Arc::clone(&engines)));

    // 5. Dispatcher
    let dispatcher = SpeechDispatcher::new(session, backends, rt.handle().clone());

    // 6. OCR
    let extractor = Arc::new(TesseractCli::from_config(&config.ocr));

    // 7. Build the egui app and run it (blocks until the window is closed)
    let app = ReaderApp::new(dispatcher, extractor, probe, engines, rt.handle().clone());
    let options = native_options(&config);

    let result = eframe::run_native(
        "Image-to-Speech Reader",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    );

    // 8. Runtime shutdown
    shutdown_runtime(rt);
    log::info!("Application stopped");
    result
}

/// Drop the runtime without waiting for blocking playback or speech to end.
fn shutdown_runtime(rt: tokio::runtime::Runtime) {
    rt.shutdown_timeout(SHUTDOWN_GRACE);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
