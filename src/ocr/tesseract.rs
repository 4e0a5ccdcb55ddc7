//! [`TextExtractor`] backed by the `tesseract` command-line tool.

use std::io;
use std::path::Path;
use std::process::Command;

use crate::config::OcrConfig;

use super::{TextExtractor, ERROR_MARKER, NO_TEXT_SENTINEL};

/// Runs `<command> <image> stdout -l <languages>` and returns its stdout.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
    languages: String,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>, languages: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            languages: languages.into(),
        }
    }

    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(config.tesseract_command.clone(), config.languages.clone())
    }
}

impl TextExtractor for TesseractCli {
    fn extract_text(&self, image_path: &Path) -> String {
        if !image_path.is_file() {
            let msg = format!("Image file not found at {}", image_path.display());
            log::error!("{msg}");
            return format!("{ERROR_MARKER} {msg}");
        }

        log::info!("Processing image: {}", image_path.display());

        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::error!("Tesseract OCR is not found ({})", self.command);
                return format!(
                    "{ERROR_MARKER} Tesseract OCR is not found.\n\
                     Please make sure it is installed and added to your system's PATH."
                );
            }
            Err(e) => {
                log::error!("failed to run {}: {e}", self.command);
                return format!("{ERROR_MARKER} An unexpected error occurred: {e}");
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("tesseract exited with {}: {}", output.status, stderr.trim());
            return format!(
                "{ERROR_MARKER} An unexpected error occurred: tesseract exited with {}",
                output.status
            );
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            log::warn!("No text extracted from image");
            return NO_TEXT_SENTINEL.to_string();
        }

        log::info!("Successfully extracted {} characters", text.chars().count());
        text
    }
}
