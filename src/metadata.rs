//! Collaborator seam for image metadata extraction.
//!
//! Reading generation parameters out of an image's embedded metadata is
//! format-specific work owned by the host; this crate only consumes the
//! resulting text. The [`PromptReader`] trait is that boundary. Implementors
//! distinguish "the file could not be read" from "the file carries no
//! prompt" so the analyzer can log the former, but both outcomes leave the
//! file uncached and retried on the next run.

use std::path::Path;

use thiserror::Error;

/// Errors a metadata reader can report for one file.
#[derive(Debug, Error)]
pub enum PromptReadError {
    /// The file could not be opened or read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file was readable but its image data or metadata container is
    /// corrupt or in an unsupported format.
    #[error("unreadable image metadata in {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

/// Extracts raw generation-parameters text from an image file.
///
/// `Ok(Some(text))` is the embedded parameters record, `Ok(None)` means the
/// image carries no prompt, and `Err` means the file itself could not be
/// read. Implementations must be shareable across analysis threads.
pub trait PromptReader: Send + Sync {
    fn read_prompt(&self, path: &Path) -> Result<Option<String>, PromptReadError>;
}
