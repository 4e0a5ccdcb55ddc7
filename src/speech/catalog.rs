//! Speech options offered for each [`Mode`]: the fixed cloud language table
//! or the voices installed in the host speech engine.

use super::local::EngineFactory;
use super::Mode;

// ---------------------------------------------------------------------------
// SpeechOption
// ---------------------------------------------------------------------------

/// A user-facing name paired with its backend identifier.
///
/// `id` is a two-letter language code for cloud options and an opaque
/// engine voice id for local options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechOption {
    pub name: String,
    pub id: String,
}

impl SpeechOption {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Languages offered by the cloud backend, display name → language code.
pub fn cloud_languages() -> Vec<SpeechOption> {
    [
        ("English", "en"),
        ("Romanian", "ro"),
        ("German", "de"),
        ("French", "fr"),
        ("Italian", "it"),
        ("Spanish", "es"),
        ("Finnish", "fi"),
        ("Swedish", "sv"),
    ]
    .into_iter()
    .map(|(name, code)| SpeechOption::new(name, code))
    .collect()
}

/// Voices installed in the host speech engine.
///
/// Blocking. Returns an empty list when the engine is missing or cannot be
/// queried; the caller treats that as "no offline speech".
pub fn local_voices(factory: &dyn EngineFactory) -> Vec<SpeechOption> {
    let voices = factory.create().and_then(|mut engine| {
        let voices = engine.voices();
        let _ = engine.stop();
        voices
    });

    match voices {
        Ok(voices) => {
            log::info!("Found {} local voices", voices.len());
            voices
        }
        Err(e) => {
            log::error!("Error getting local voice list: {e}");
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceCatalog
// ---------------------------------------------------------------------------

/// Snapshot of the options available for one mode.
///
/// Names are unique: when the engine reports two voices with the same name
/// the first one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCatalog {
    mode: Mode,
    options: Vec<SpeechOption>,
}

impl VoiceCatalog {
    pub fn new(mode: Mode, options: Vec<SpeechOption>) -> Self {
        let mut unique: Vec<SpeechOption> = Vec::with_capacity(options.len());
        for option in options {
            if unique.iter().any(|o| o.name == option.name) {
                log::debug!("catalog: dropping duplicate option {:?}", option.name);
                continue;
            }
            unique.push(option);
        }
        Self {
            mode,
            options: unique,
        }
    }

    /// The fixed cloud language table.
    pub fn cloud() -> Self {
        Self::new(Mode::Online, cloud_languages())
    }

    /// Voices enumerated from the host engine. Blocking.
    pub fn local(factory: &dyn EngineFactory) -> Self {
        Self::new(Mode::Offline, local_voices(factory))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &[SpeechOption] {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Whether the read action can be offered at all.
    pub fn speech_available(&self) -> bool {
        !self.options.is_empty()
    }

    /// Backend identifier for a display name.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.id.as_str())
    }

    /// Option to pre-select when the menu is populated.
    ///
    /// Online prefers Romanian, then English, else nothing. Offline selects
    /// the first installed voice.
    pub fn default_selection(&self) -> Option<&str> {
        match self.mode {
            Mode::Online => ["Romanian", "English"]
                .into_iter()
                .find(|name| self.resolve(name).is_some()),
            Mode::Offline => self.options.first().map(|o| o.name.as_str()),
        }
    }

    /// Label shown above the option menu.
    pub fn heading(&self) -> &'static str {
        match self.mode {
            Mode::Online => "Language (Google Cloud):",
            Mode::Offline if self.is_empty() => "Voice (Offline): NOT FOUND",
            Mode::Offline => "Voice (Local Fallback):",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
