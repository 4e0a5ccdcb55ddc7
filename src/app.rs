//! Image-to-Speech Reader window (egui/eframe).
//!
//! # Architecture
//!
//! [`ReaderApp`] is the top-level [`eframe::App`]. It owns the
//! [`SpeechDispatcher`] and two optional one-shot receivers for work it
//! pushes onto the tokio runtime:
//!
//! * `ocr_rx`: text extracted from the loaded image.
//! * `refresh_rx`: a freshly detected [`SpeechSession`].
//!
//! Every frame `update()` drains those receivers and the dispatcher's
//! terminal events without blocking, then renders.
//!
//! # Control states
//!
//! | Condition | Load | Read | Options | Stop | Refresh |
//! |-----------|------|------|---------|------|---------|
//! | Idle, voices available | on | on | on | off | on |
//! | OCR running | off | off | on | - | on |
//! | Speaking | on | off | off | on | off |
//! | Refreshing | on | off | off | - | off |
//! | No voices | on | off | off | - | on |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::dispatch::{is_speakable, DispatchEvent, SpeechDispatcher, SpeechSession};
use crate::ocr::{TextExtractor, ERROR_MARKER, PROCESSING_PLACEHOLDER};
use crate::speech::{ConnectivityProbe, EngineFactory};

/// Extensions offered by the Load Image dialog.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff"];

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

/// Which controls are enabled this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub load: bool,
    pub read: bool,
    pub options: bool,
    pub stop: bool,
    pub refresh: bool,
}

impl Controls {
    pub fn derive(busy: bool, ocr_running: bool, refreshing: bool, speech_available: bool) -> Self {
        Self {
            load: !ocr_running,
            read: speech_available && !busy && !ocr_running && !refreshing,
            options: speech_available && !busy && !refreshing,
            stop: busy,
            refresh: !busy && !refreshing,
        }
    }
}

// ---------------------------------------------------------------------------
// ReaderApp
// ---------------------------------------------------------------------------

/// The reader window.
pub struct ReaderApp {
    // ── Speech ───────────────────────────────────────────────────────────
    dispatcher: SpeechDispatcher,
    /// Display name of the selected language or voice.
    selected: Option<String>,

    // ── OCR ──────────────────────────────────────────────────────────────
    extractor: Arc<dyn TextExtractor>,
    image_path: Option<PathBuf>,
    /// OCR output, editable by the user before reading.
    text: String,

    // ── Background work ──────────────────────────────────────────────────
    runtime: Handle,
    probe: ConnectivityProbe,
    engines: Arc<dyn EngineFactory>,
    ocr_rx: Option<oneshot::Receiver<String>>,
    refresh_rx: Option<oneshot::Receiver<SpeechSession>>,

    // ── Dialogs ──────────────────────────────────────────────────────────
    warning: Option<String>,
    speech_error: Option<String>,
}

impl ReaderApp {
    pub fn new(
        dispatcher: SpeechDispatcher,
        extractor: Arc<dyn TextExtractor>,
        probe: ConnectivityProbe,
        engines: Arc<dyn EngineFactory>,
        runtime: Handle,
    ) -> Self {
        let selected = dispatcher.catalog().default_selection().map(str::to_string);
        Self {
            dispatcher,
            selected,
            extractor,
            image_path: None,
            text: String::new(),
            runtime,
            probe,
            engines,
            ocr_rx: None,
            refresh_rx: None,
            warning: None,
            speech_error: None,
        }
    }

    fn controls(&self) -> Controls {
        Controls::derive(
            self.dispatcher.is_busy(),
            self.ocr_rx.is_some(),
            self.refresh_rx.is_some(),
            self.dispatcher.catalog().speech_available(),
        )
    }

    fn read_hint(&self) -> &'static str {
        if is_speakable(&self.text) {
            "Read the text aloud"
        } else {
            "Load an image with readable text first"
        }
    }

    // ── Actions ──────────────────────────────────────────────────────────

    /// Run OCR on `path` off the UI thread.
    fn load_image(&mut self, path: PathBuf) {
        log::info!("Image selected: {}", path.display());
        self.text = PROCESSING_PLACEHOLDER.to_string();
        self.image_path = Some(path.clone());

        let (tx, rx) = oneshot::channel();
        let extractor = Arc::clone(&self.extractor);
        self.runtime.spawn_blocking(move || {
            let _ = tx.send(extractor.extract_text(&path));
        });
        self.ocr_rx = Some(rx);
    }

    fn read_text(&mut self) {
        log::info!("'Read Text' button pressed");
        let option = self.selected.clone().unwrap_or_default();
        if let Err(e) = self.dispatcher.submit(&self.text, &option) {
            log::warn!("read refused: {e:?}");
            self.warning = Some(e.to_string());
        }
    }

    fn refresh_connectivity(&mut self) {
        log::info!("'Refresh' button pressed");
        let (tx, rx) = oneshot::channel();
        let probe = self.probe.clone();
        let engines = Arc::clone(&self.engines);
        self.runtime.spawn(async move {
            let _ = tx.send(SpeechSession::detect(&probe, engines).await);
        });
        self.refresh_rx = Some(rx);
    }

    // ── Channel polling ──────────────────────────────────────────────────

    fn poll_ocr(&mut self) {
        let Some(rx) = self.ocr_rx.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(text) => {
                self.text = text;
                self.ocr_rx = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                log::error!("OCR task ended without a result");
                self.text = format!("{ERROR_MARKER} OCR stopped unexpectedly.");
                self.ocr_rx = None;
            }
        }
    }

    fn poll_refresh(&mut self) {
        let Some(rx) = self.refresh_rx.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(session) => {
                self.refresh_rx = None;
                match self.dispatcher.replace_session(session) {
                    Ok(()) => {
                        self.selected = self
                            .dispatcher
                            .catalog()
                            .default_selection()
                            .map(str::to_string);
                    }
                    Err(e) => log::warn!("refresh discarded: {e}"),
                }
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                log::error!("connectivity refresh ended without a result");
                self.refresh_rx = None;
            }
        }
    }

    fn poll_speech(&mut self) {
        match self.dispatcher.poll() {
            Some(DispatchEvent::Finished) => log::info!("Speech finished"),
            Some(DispatchEvent::Error(message)) => self.speech_error = Some(message),
            None => {}
        }
    }

    // ── Panels ───────────────────────────────────────────────────────────

    fn draw_toolbar(&mut self, ui: &mut egui::Ui, controls: Controls) {
        ui.horizontal(|ui| {
            if ui
                .add_enabled(controls.load, egui::Button::new("Load Image"))
                .clicked()
            {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Images", IMAGE_EXTENSIONS)
                    .pick_file()
                {
                    self.load_image(path);
                }
            }

            let image = self
                .image_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "No image loaded".into());
            ui.label(egui::RichText::new(image).color(egui::Color32::from_rgb(140, 140, 140)));
        });
    }

    fn draw_speech_controls(&mut self, ui: &mut egui::Ui, controls: Controls) {
        let catalog = self.dispatcher.catalog();
        ui.horizontal(|ui| {
            ui.label(catalog.heading());

            let shown = self.selected.clone().unwrap_or_default();
            ui.add_enabled_ui(controls.options, |ui| {
                egui::ComboBox::from_id_salt("speech_option")
                    .selected_text(shown)
                    .width(220.0)
                    .show_ui(ui, |ui| {
                        for option in catalog.options() {
                            ui.selectable_value(
                                &mut self.selected,
                                Some(option.name.clone()),
                                option.name.as_str(),
                            );
                        }
                    });
            });
        });

        ui.horizontal(|ui| {
            if ui
                .add_enabled(controls.read, egui::Button::new("Read Text"))
                .on_hover_text(self.read_hint())
                .clicked()
            {
                self.read_text();
            }
            if ui
                .add_enabled(controls.stop, egui::Button::new("Stop"))
                .clicked()
            {
                self.dispatcher.stop();
            }
            if ui
                .add_enabled(controls.refresh, egui::Button::new("Refresh"))
                .on_hover_text("Check the internet connection again")
                .clicked()
            {
                self.refresh_connectivity();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let status = if self.refresh_rx.is_some() {
                    "Checking connection...".to_string()
                } else {
                    format!(
                        "{} | {}",
                        self.dispatcher.mode().label(),
                        self.dispatcher.state().label()
                    )
                };
                ui.label(egui::RichText::new(status).color(egui::Color32::from_rgb(140, 140, 140)));
            });
        });
    }

    fn draw_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(message) = self.warning.clone() {
            if message_window(ctx, "Warning", &message) {
                self.warning = None;
            }
        }
        if let Some(message) = self.speech_error.clone() {
            let text = format!("Speech synthesis failed:\n{message}");
            if message_window(ctx, "Speech Error", &text) {
                self.speech_error = None;
            }
        }
    }
}

/// A centred modal-style window. Returns `true` when dismissed.
fn message_window(ctx: &egui::Context, title: &str, message: &str) -> bool {
    let mut dismissed = false;
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(message);
            ui.add_space(6.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
    dismissed
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for ReaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll non-blocking channels ------------------------------------
        self.poll_ocr();
        self.poll_refresh();
        self.poll_speech();

        // --- Keep polling while background work is pending ----------------
        if self.dispatcher.is_busy() || self.ocr_rx.is_some() || self.refresh_rx.is_some() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        let controls = self.controls();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_toolbar(ui, controls);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("speech").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_speech_controls(ui, controls);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_enabled(
                    self.ocr_rx.is_none(),
                    egui::TextEdit::multiline(&mut self.text)
                        .hint_text("Load an image to extract its text")
                        .desired_width(f32::INFINITY)
                        .desired_rows(20),
                );
            });
        });

        self.draw_dialogs(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.dispatcher.stop();
        log::info!("Image-to-Speech Reader closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
