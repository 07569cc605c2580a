//! Per-source handlers and the conversion backends they drive.
//!
//! The orchestrator sees the heavy lifting only through two seams:
//!
//! * [`PdfConverter`]: text extraction, page splitting, rasterisation and
//!   ALTO generation for a PDF. [`pdfium::PdfiumConverter`] is the production
//!   implementation.
//! * [`CommandRunner`]: running an external program to completion.
//!   [`epub::ProcessRunner`] is the production implementation.
//!
//! ## Data Flow (one PDF source)
//!
//! ```text
//! source.pdf ──▶ text ──▶ split ─┬─▶ alto ──▶ cleanup
//!                         render ┘
//! (pdfium)       (pdfium) (lopdf) (pdfium/gs) (pdfium + quick-xml)
//! ```
//!
//! 1. [`text`]: per-page text, normalised, written as UTF-8
//! 2. [`split`]: one single-page PDF per page
//! 3. [`render`]: one raster image per page, rendered in a temp workspace
//! 4. [`alto`]: ALTO v4 per single-page PDF, paired with its image
//! 5. [`pdf`]: drives 1–4, advances the page counter, deletes extra images
//!
//! EPUB sources go through [`epub`] instead.

pub mod alto;
pub mod epub;
pub mod pdf;
pub mod pdfium;
pub mod render;
pub mod split;
pub mod text;

use crate::error::FulltextError;
use std::path::{Path, PathBuf};

/// Conversion engine for PDF sources.
///
/// Every `write_*` method numbers its files from `first_page` and returns the
/// written paths in page order.
pub trait PdfConverter: Send + Sync {
    /// Write the text of every page to `text_dir`.
    fn write_full_text(
        &self,
        source: &Path,
        text_dir: &Path,
        first_page: u32,
    ) -> Result<Vec<PathBuf>, FulltextError>;

    /// Write one single-page PDF per page to `pdf_dir`.
    fn write_single_page_pdfs(
        &self,
        source: &Path,
        pdf_dir: &Path,
        first_page: u32,
    ) -> Result<Vec<PathBuf>, FulltextError>;

    /// Rasterise every page into `image_dir`.
    fn write_images(
        &self,
        source: &Path,
        image_dir: &Path,
        first_page: u32,
    ) -> Result<Vec<PathBuf>, FulltextError>;

    /// Write the ALTO file for a single-page PDF, using `image` for pixel
    /// coordinates when present. Returns the written path.
    fn write_alto(
        &self,
        page_pdf: &Path,
        alto_dir: &Path,
        image: Option<&Path>,
    ) -> Result<PathBuf, FulltextError>;
}

/// Runs an external program and waits for it.
pub trait CommandRunner: Send + Sync {
    /// `argv[0]` is the program. Returns the exit code, `None` when the
    /// process was terminated by a signal.
    fn run(&self, argv: &[String]) -> std::io::Result<Option<i32>>;
}

/// Artifact file name for a page: `00000042.tif`.
pub fn page_file_name(page: u32, ext: &str) -> String {
    format!("{:08}.{}", page, ext)
}
