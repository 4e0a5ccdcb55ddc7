//! Application settings structs, defaults and TOML loading.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`.
//! Every section is `#[serde(default)]`, so a `settings.toml` that sets only
//! a handful of keys still yields a complete configuration.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for connectivity detection and both speech backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// URL requested once at startup to decide between Online and Offline.
    pub probe_url: String,
    /// Upper bound for the connectivity probe, in seconds.
    pub probe_timeout_secs: u64,
    /// Local engine speaking rate in words per minute.
    pub speech_rate_wpm: u32,
    /// File-name prefix for the temporary audio file of a cloud job.
    pub temp_audio_prefix: String,
    /// Base URL of the cloud speech endpoint (`/translate_tts` is appended).
    pub cloud_base_url: String,
    /// Per-request timeout for cloud synthesis, in seconds.
    pub cloud_timeout_secs: u64,
}

impl SpeechConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn cloud_timeout(&self) -> Duration {
        Duration::from_secs(self.cloud_timeout_secs)
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            probe_url: "https://www.google.com".into(),
            probe_timeout_secs: 3,
            speech_rate_wpm: 150,
            temp_audio_prefix: "speech_".into(),
            cloud_base_url: "https://translate.google.com".into(),
            cloud_timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// OcrConfig
// ---------------------------------------------------------------------------

/// Settings for the Tesseract OCR collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Executable name or absolute path of the `tesseract` binary.
    pub tesseract_command: String,
    /// Tesseract language list, `+`-separated.
    pub languages: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_command: "tesseract".into(),
            languages: "eng+deu+fra+ita+fin+ron+spa+swe".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub window_min_width: f32,
    pub window_min_height: f32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_min_width: 800.0,
            window_min_height: 600.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, read from `settings.toml`.
///
/// The application only ever reads this file; nothing the user does in the
/// window is written back.
///
/// ```rust,no_run
/// use image_to_speech::config::AppConfig;
///
/// // Returns Default when the file is missing
/// let config = AppConfig::load().unwrap();
/// assert_eq!(config.speech.speech_rate_wpm, 150);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Connectivity probe and speech backend settings.
    pub speech: SpeechConfig,
    /// OCR settings.
    pub ocr: OcrConfig,
    /// Window settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.speech.probe_url, "https://www.google.com");
        assert_eq!(cfg.speech.probe_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.speech.speech_rate_wpm, 150);
        assert_eq!(cfg.speech.temp_audio_prefix, "speech_");
        assert_eq!(cfg.speech.cloud_base_url, "https://translate.google.com");
        assert_eq!(cfg.ocr.tesseract_command, "tesseract");
        assert_eq!(cfg.ocr.languages, "eng+deu+fra+ita+fin+ron+spa+swe");
        assert_eq!(cfg.ui.window_min_width, 800.0);
        assert_eq!(cfg.ui.window_min_height, 600.0);
    }

    /// Keys missing from the file fall back to their defaults.
    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[speech]\nprobe_timeout_secs = 1\nspeech_rate_wpm = 180\n\n[ocr]\nlanguages = \"eng\"\n",
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");

        assert_eq!(cfg.speech.probe_timeout_secs, 1);
        assert_eq!(cfg.speech.speech_rate_wpm, 180);
        assert_eq!(cfg.speech.probe_url, "https://www.google.com");
        assert_eq!(cfg.speech.temp_audio_prefix, "speech_");
        assert_eq!(cfg.ocr.languages, "eng");
        assert_eq!(cfg.ocr.tesseract_command, "tesseract");
        assert_eq!(cfg.ui, UiConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[speech\nprobe_url = ").expect("write");

        assert!(AppConfig::load_from(&path).is_err());
    }
}
