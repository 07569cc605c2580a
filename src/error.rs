//! Error types for the fulltext-generation library.
//!
//! Two distinct error types reflect the two severities of a run:
//!
//! * [`FulltextError`] (**fatal**): the run stops at once (source directory
//!   cannot be listed, an output directory cannot be created, a PDF cannot be
//!   read or its artifacts cannot be written). Returned as
//!   `Err(FulltextError)` from [`crate::FulltextGenerator::run`].
//!
//! * [`SourceError`] (**non-fatal**): one EPUB source could not be converted.
//!   Stored inside [`crate::output::SourceFailure`] so the host can see what
//!   was skipped while the rest of the job still completes.
//!
//! Storage seams report [`StorageError`], which the orchestrator wraps with
//! the path it was working on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the fulltext-generation library.
#[derive(Debug, Error)]
pub enum FulltextError {
    // ── Storage errors ────────────────────────────────────────────────────
    /// The job's source directory could not be enumerated.
    #[error("Failed to list source directory '{path}': {source}")]
    ListingFailed {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    /// An output directory did not exist and could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    /// A transient page image could not be removed after ALTO generation.
    #[error("Failed to delete generated image '{path}': {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The source PDF could not be opened or parsed.
    #[error("Cannot read PDF '{path}': {detail}")]
    PdfRead { path: PathBuf, detail: String },

    /// An artifact derived from a PDF could not be written.
    #[error("Cannot write '{path}': {detail}")]
    PdfWrite { path: PathBuf, detail: String },

    /// The rasterisation backend failed on a page (or on the whole file for
    /// external backends, where `page` is 0).
    #[error("Rasterisation failed for page {page} of '{path}': {detail}")]
    RasterisationFailed {
        path: PathBuf,
        page: usize,
        detail: String,
    },

    /// Serialising an ALTO document failed.
    #[error("ALTO generation failed for '{path}': {detail}")]
    AltoFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The plugin configuration file could not be read or parsed.
    #[error("Cannot load configuration file '{path}': {detail}")]
    ConfigFile { path: PathBuf, detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium on this host, or\n\
  • set PDFIUM_LIB_PATH=/path/to/libpdfium, or\n\
  • set `pdfium_library` in the plugin configuration.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure reported by a [`crate::storage::Storage`] implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The data lives on offline (swapped-out) storage and is not reachable.
    #[error("'{0}' is swapped out to offline storage")]
    SwappedOut(PathBuf),
}

/// A non-fatal error for a single EPUB source.
///
/// Recorded in the run report; the run continues with the next file.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum SourceError {
    /// No converter command is configured for EPUB sources.
    #[error("No EPUB command configured; '{source_file}' was not converted")]
    NoCommand { source_file: PathBuf },

    /// The converter process could not be started.
    #[error("Failed to launch '{program}': {detail}")]
    LaunchFailed { program: String, detail: String },

    /// Waiting for the converter process failed.
    #[error("Failed while waiting for '{program}': {detail}")]
    WaitFailed { program: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_failure_display_names_path() {
        let e = FulltextError::ListingFailed {
            path: PathBuf::from("/data/1/images/book_media"),
            source: StorageError::SwappedOut(PathBuf::from("/data/1")),
        };
        let msg = e.to_string();
        assert!(msg.contains("book_media"), "got: {msg}");
    }

    #[test]
    fn storage_io_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let e = StorageError::from(io);
        assert_eq!(e.to_string(), "nope");
    }

    #[test]
    fn rasterisation_display() {
        let e = FulltextError::RasterisationFailed {
            path: PathBuf::from("a.pdf"),
            page: 3,
            detail: "bad stream".into(),
        };
        assert!(e.to_string().contains("page 3"));
        assert!(e.to_string().contains("bad stream"));
    }

    #[test]
    fn source_error_roundtrips_through_json() {
        let e = SourceError::LaunchFailed {
            program: "ebook-convert".into(),
            detail: "not found".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: SourceError = serde_json::from_str(&json).unwrap();
        assert!(back.to_string().contains("ebook-convert"));
    }
}
