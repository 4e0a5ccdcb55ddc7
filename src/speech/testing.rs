//! Test doubles shared by the speech and dispatch test modules.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::catalog::SpeechOption;
use super::cloud::CloudSynthesizer;
use super::local::{wait_for_speech, EngineFactory, LocalEngine, SpeechEnd, SPEAK_START_TIMEOUT};
use super::playback::AudioPlayer;
use super::worker::CancelFlag;
use super::SpeechError;

// ---------------------------------------------------------------------------
// Local HTTP endpoints
// ---------------------------------------------------------------------------

/// A one-route HTTP server on 127.0.0.1 that records request lines.
pub(crate) struct TestServer {
    pub url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Request lines received so far, e.g. `GET /translate_tts?... HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Answer every request with `status` and `body`, closing the connection.
pub(crate) async fn serve_http(status: u16, body: Vec<u8>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let recorded = Arc::clone(&recorded);
            let body = body.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head);
                if let Some(line) = head.lines().next() {
                    recorded.lock().unwrap().push(line.to_string());
                }

                let header = format!(
                    "HTTP/1.1 {status} Test\r\nContent-Type: audio/mpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(header.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer {
        url: format!("http://{addr}"),
        requests,
    }
}

/// Accepts connections and never answers.
pub(crate) async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}/")
}

/// A loopback URL nothing listens on.
pub(crate) async fn unused_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}/")
}

// ---------------------------------------------------------------------------
// Cloud synthesizers
// ---------------------------------------------------------------------------

/// Returns fixed audio and records each `(text, lang)` call.
pub(crate) struct RecordingSynthesizer {
    audio: Vec<u8>,
    cancel_on_call: Option<CancelFlag>,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingSynthesizer {
    pub fn ok(audio: &[u8]) -> Self {
        Self {
            audio: audio.to_vec(),
            cancel_on_call: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Raise `flag` while synthesizing, as a user pressing Stop would.
    pub fn cancelling(mut self, flag: CancelFlag) -> Self {
        self.cancel_on_call = Some(flag);
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudSynthesizer for RecordingSynthesizer {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>, SpeechError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), lang.to_string()));
        if let Some(flag) = &self.cancel_on_call {
            flag.cancel();
        }
        Ok(self.audio.clone())
    }
}

/// Always fails as if the service were unreachable.
pub(crate) struct FailingSynthesizer;

#[async_trait]
impl CloudSynthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str, _lang: &str) -> Result<Vec<u8>, SpeechError> {
        Err(SpeechError::Network("connection refused".into()))
    }
}

/// Replaces every file in `dir` with a non-empty directory, then fails
/// like an unreachable service.
pub(crate) struct SwapForDirSynthesizer {
    pub dir: PathBuf,
}

#[async_trait]
impl CloudSynthesizer for SwapForDirSynthesizer {
    async fn synthesize(&self, _text: &str, _lang: &str) -> Result<Vec<u8>, SpeechError> {
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                swap_for_dir(&path)?;
            }
        }
        Err(SpeechError::Network("connection reset".into()))
    }
}

pub(crate) struct PanickingSynthesizer;

#[async_trait]
impl CloudSynthesizer for PanickingSynthesizer {
    async fn synthesize(&self, _text: &str, _lang: &str) -> Result<Vec<u8>, SpeechError> {
        panic!("synthesizer bug");
    }
}

/// Waits for a permit on the returned `Notify` before producing audio.
pub(crate) struct GatedSynthesizer {
    gate: Arc<Notify>,
    calls: AtomicUsize,
}

impl GatedSynthesizer {
    pub fn new() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                gate: Arc::clone(&gate),
                calls: AtomicUsize::new(0),
            },
            gate,
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CloudSynthesizer for GatedSynthesizer {
    async fn synthesize(&self, _text: &str, _lang: &str) -> Result<Vec<u8>, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(b"MP3DATA".to_vec())
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Records the path and file contents of every playback.
pub(crate) struct RecordingPlayer {
    fail: bool,
    played: Mutex<Vec<(PathBuf, Vec<u8>)>>,
}

impl RecordingPlayer {
    pub fn ok() -> Self {
        Self {
            fail: false,
            played: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn played(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.played.lock().unwrap().clone()
    }
}

impl AudioPlayer for RecordingPlayer {
    fn play_file(&self, path: &Path) -> Result<(), SpeechError> {
        let contents = std::fs::read(path)?;
        self.played
            .lock()
            .unwrap()
            .push((path.to_path_buf(), contents));
        if self.fail {
            return Err(SpeechError::Playback("no output device".into()));
        }
        Ok(())
    }
}

/// Replaces the audio file with a non-empty directory so it cannot be
/// deleted afterwards.
pub(crate) struct SwapForDirPlayer {
    fail: bool,
}

impl SwapForDirPlayer {
    pub fn succeeding() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

fn swap_for_dir(path: &Path) -> std::io::Result<()> {
    std::fs::remove_file(path)?;
    std::fs::create_dir(path)?;
    std::fs::write(path.join("keep"), b"x")
}

impl AudioPlayer for SwapForDirPlayer {
    fn play_file(&self, path: &Path) -> Result<(), SpeechError> {
        swap_for_dir(path)?;
        if self.fail {
            return Err(SpeechError::Playback("decoder error".into()));
        }
        Ok(())
    }
}

/// Blocks in `play_file` until the returned sender fires or is dropped.
pub(crate) struct GatedPlayer {
    release: Mutex<mpsc::Receiver<()>>,
    plays: AtomicUsize,
}

impl GatedPlayer {
    pub fn new() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                release: Mutex::new(rx),
                plays: AtomicUsize::new(0),
            },
            tx,
        )
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

impl AudioPlayer for GatedPlayer {
    fn play_file(&self, _path: &Path) -> Result<(), SpeechError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        let _ = self.release.lock().unwrap().recv();
        Ok(())
    }
}

pub(crate) struct PanickingPlayer;

impl AudioPlayer for PanickingPlayer {
    fn play_file(&self, _path: &Path) -> Result<(), SpeechError> {
        panic!("audio device exploded");
    }
}

// ---------------------------------------------------------------------------
// Local engine
// ---------------------------------------------------------------------------

/// Engine factory whose engines append every command to a shared log.
///
/// Log entries: `voice:<id>`, `rate:<wpm>`, `speak:<text>`, `end`, `stop`.
/// `end` is only logged by engines that report speech progress.
#[derive(Default)]
pub(crate) struct ScriptedEngineFactory {
    voices: Vec<SpeechOption>,
    unavailable: bool,
    fail_voices: bool,
    fail_speak: bool,
    fail_stop: bool,
    progress: Progress,
    events: Arc<Mutex<Vec<String>>>,
    created: AtomicUsize,
}

impl ScriptedEngineFactory {
    pub fn with_voices(voices: Vec<SpeechOption>) -> Self {
        Self {
            voices,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn fail_voices(mut self) -> Self {
        self.fail_voices = true;
        self
    }

    pub fn fail_speak(mut self) -> Self {
        self.fail_speak = true;
        self
    }

    pub fn fail_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Engines report speaking from `start` after `speak` until `start + length`.
    pub fn late_start(mut self, start: Duration, length: Duration) -> Self {
        self.progress = Progress::Delayed { start, length };
        self
    }

    /// Engines cannot report whether they are still speaking.
    pub fn untracked(mut self) -> Self {
        self.progress = Progress::Untracked;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl EngineFactory for ScriptedEngineFactory {
    fn create(&self) -> Result<Box<dyn LocalEngine>, SpeechError> {
        if self.unavailable {
            return Err(SpeechError::EngineInit("no speech engine installed".into()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedEngine {
            voices: self.voices.clone(),
            fail_voices: self.fail_voices,
            fail_speak: self.fail_speak,
            fail_stop: self.fail_stop,
            progress: self.progress,
            spoken_at: None,
            events: Arc::clone(&self.events),
        }))
    }
}

#[derive(Debug, Default, Clone, Copy)]
enum Progress {
    /// Speech is over by the time `speak` returns.
    #[default]
    Immediate,
    Delayed {
        start: Duration,
        length: Duration,
    },
    Untracked,
}

struct ScriptedEngine {
    voices: Vec<SpeechOption>,
    fail_voices: bool,
    fail_speak: bool,
    fail_stop: bool,
    progress: Progress,
    spoken_at: Option<Instant>,
    events: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl LocalEngine for ScriptedEngine {
    fn voices(&self) -> Result<Vec<SpeechOption>, SpeechError> {
        if self.fail_voices {
            return Err(SpeechError::Engine("voice query failed".into()));
        }
        Ok(self.voices.clone())
    }

    fn set_voice(&mut self, voice_id: &str) -> Result<(), SpeechError> {
        self.record(format!("voice:{voice_id}"));
        Ok(())
    }

    fn set_rate_wpm(&mut self, wpm: u32) -> Result<(), SpeechError> {
        self.record(format!("rate:{wpm}"));
        Ok(())
    }

    fn speak(&mut self, text: &str) -> Result<(), SpeechError> {
        self.record(format!("speak:{text}"));
        if self.fail_speak {
            return Err(SpeechError::Engine("speak failed".into()));
        }
        self.spoken_at = Some(Instant::now());
        Ok(())
    }

    fn wait_until_done(&mut self) -> Result<SpeechEnd, SpeechError> {
        match self.progress {
            Progress::Immediate => Ok(SpeechEnd::Done),
            Progress::Untracked => Ok(SpeechEnd::Unknown),
            Progress::Delayed { start, length } => {
                let spoken_at = self.spoken_at.unwrap_or_else(Instant::now);
                let end = wait_for_speech(
                    || {
                        let elapsed = spoken_at.elapsed();
                        Ok(elapsed >= start && elapsed < start + length)
                    },
                    SPEAK_START_TIMEOUT,
                    Duration::from_millis(10),
                )?;
                if end == SpeechEnd::Done {
                    self.record("end".into());
                }
                Ok(end)
            }
        }
    }

    fn stop(&mut self) -> Result<(), SpeechError> {
        self.record("stop".into());
        if self.fail_stop {
            return Err(SpeechError::Engine("stop failed".into()));
        }
        Ok(())
    }
}
