//! OCR collaborator: image path in, text (or a marked failure string) out.
//!
//! Extraction never fails as a `Result`. Problems come back as text that
//! starts with [`ERROR_MARKER`], and an image without text yields
//! [`NO_TEXT_SENTINEL`]. The dispatcher refuses to speak either.

pub mod tesseract;

pub use tesseract::TesseractCli;

use std::path::Path;

/// Prefix of every failure string returned by a [`TextExtractor`].
pub const ERROR_MARKER: &str = "ERROR:";

/// Shown in the text area while OCR runs.
pub const PROCESSING_PLACEHOLDER: &str = "Processing... please wait.";

/// Substring that identifies the placeholder, whatever follows it.
pub const PROCESSING_MARKER: &str = "Processing...";

/// Returned when OCR succeeded but found no text.
pub const NO_TEXT_SENTINEL: &str = "No text could be extracted from this image.";

/// Extracts text from an image file. Blocking.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image_path: &Path) -> String;
}

// Compile-time assertion: Arc<dyn TextExtractor> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: std::sync::Arc<dyn TextExtractor>) {}
};
