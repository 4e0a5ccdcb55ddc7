//! Configuration module for the Image-to-Speech reader.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for the cross-platform config directory, and TOML loading via
//! `AppConfig::load`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, OcrConfig, SpeechConfig, UiConfig};
