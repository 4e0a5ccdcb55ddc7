//! Job-scoped temporary audio file for the cloud worker.
//!
//! The file is created with a unique name before synthesis starts and must
//! be released through [`TempAudioFile::cleanup`] on every exit path. If the
//! owning task unwinds before reaching cleanup, the inner `TempPath` still
//! removes the file on drop.

use std::io;
use std::path::Path;

use tempfile::TempPath;

/// A uniquely named `*.mp3` file that lives for exactly one cloud job.
#[derive(Debug)]
pub struct TempAudioFile {
    path: TempPath,
}

impl TempAudioFile {
    /// Create an empty file named `<prefix>XXXXXX.mp3` inside `dir`.
    pub fn create_in(dir: &Path, prefix: &str) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(".mp3")
            .tempfile_in(dir)?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents with `audio`.
    pub fn write(&self, audio: &[u8]) -> io::Result<()> {
        std::fs::write(&self.path, audio)?;
        log::info!("Audio saved to {}", self.path.display());
        Ok(())
    }

    /// Delete the file.
    ///
    /// A file that no longer exists is not an error. Any other failure is
    /// logged and returned so the caller can ignore it without it leaking
    /// into the job outcome.
    pub fn cleanup(self) -> io::Result<()> {
        let display = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => {
                log::info!("Deleted temp file: {display}");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("temp file {display} was already gone");
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to delete temp file {display}: {e}");
                Err(e)
            }
        }
    }
}
