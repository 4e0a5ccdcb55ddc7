//! Pre-flight checks for a submission.
//!
//! Every [`SubmitError`] is a user-facing warning: it is detected before a
//! worker is created and leaves the dispatcher state untouched.

use thiserror::Error;

use crate::ocr::{ERROR_MARKER, NO_TEXT_SENTINEL, PROCESSING_MARKER};

/// Why a submission was refused.
///
/// The `Display` text is shown in the "Warning" dialog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Text is empty or whitespace only.
    #[error("No valid text to read.")]
    EmptyText,

    /// Text carries the OCR error marker.
    #[error("No valid text to read.")]
    ErrorText,

    /// Text is still the "processing" placeholder.
    #[error("No valid text to read.")]
    Placeholder,

    /// OCR found nothing in the image.
    #[error("No valid text to read.")]
    NoText,

    #[error("Please select a speech option.")]
    NoOptionSelected,

    /// The selected name is not in the current catalog.
    #[error("Invalid speech option selected.")]
    UnknownOption(String),

    /// The session has no speech options at all.
    #[error("No speech voice is available.")]
    NoVoices,

    /// A job is already running.
    #[error("Speech is already in progress.")]
    Busy,
}

/// Reject text that is not real OCR output.
pub fn validate_text(text: &str) -> Result<(), SubmitError> {
    if text.trim().is_empty() {
        return Err(SubmitError::EmptyText);
    }
    if text.contains(ERROR_MARKER) {
        return Err(SubmitError::ErrorText);
    }
    if text.contains(PROCESSING_MARKER) {
        return Err(SubmitError::Placeholder);
    }
    if text.trim() == NO_TEXT_SENTINEL {
        return Err(SubmitError::NoText);
    }
    Ok(())
}

/// `true` when [`validate_text`] would accept `text`.
pub fn is_speakable(text: &str) -> bool {
    validate_text(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::PROCESSING_PLACEHOLDER;

    #[test]
    fn ordinary_text_is_accepted() {
        assert_eq!(validate_text("Hello world"), Ok(()));
    }

    #[test]
    fn empty_and_blank_text_are_rejected() {
        assert_eq!(validate_text(""), Err(SubmitError::EmptyText));
        assert_eq!(validate_text("  \n\t"), Err(SubmitError::EmptyText));
    }

    #[test]
    fn ocr_error_output_is_rejected() {
        let text = "ERROR: Image file not found at /tmp/x.png";
        assert_eq!(validate_text(text), Err(SubmitError::ErrorText));
    }

    #[test]
    fn processing_placeholder_is_rejected() {
        assert_eq!(
            validate_text(PROCESSING_PLACEHOLDER),
            Err(SubmitError::Placeholder)
        );
    }

    #[test]
    fn no_text_sentinel_is_rejected() {
        assert_eq!(validate_text(NO_TEXT_SENTINEL), Err(SubmitError::NoText));
        assert!(!is_speakable(&format!("{NO_TEXT_SENTINEL}\n")));
    }

    #[test]
    fn text_warnings_share_one_message() {
        for err in [
            SubmitError::EmptyText,
            SubmitError::ErrorText,
            SubmitError::Placeholder,
            SubmitError::NoText,
        ] {
            assert_eq!(err.to_string(), "No valid text to read.");
        }
        assert_eq!(
            SubmitError::UnknownOption("Klingon".into()).to_string(),
            "Invalid speech option selected."
        );
    }
}
