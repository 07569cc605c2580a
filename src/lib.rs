//! # fulltext-generation
//!
//! Produce OCR-equivalent artifacts for born-digital documents.
//!
//! Digitisation workflows expect every process to carry per-page plain text,
//! single-page PDFs, page images and ALTO layout files. When the source is
//! already a PDF (or EPUB) there is nothing to recognise: the text layer is
//! read directly and the other artifacts are derived from it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source dir
//!  │
//!  ├─ 1. List     regular files of the job's source directory
//!  ├─ 2. Prepare  create txt / pdf / alto / image directories
//!  └─ 3. Per file, in listing order
//!       ├─ .pdf   text → split + render → ALTO → cleanup   (fatal on error)
//!       ├─ .epub  external converter → <stem>.txt           (logged on error)
//!       └─ other  skipped
//! ```
//!
//! All PDF artifacts of a job share one page counter starting at 1, so the
//! second PDF's first page follows the first PDF's last page.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fulltext_generation::{FulltextGenerator, GenerationConfig, LayoutVariant, ProcessJob};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::builder()
//!         .variant(LayoutVariant::Thumbs)
//!         .epub_command(["ebook-convert", "{input}", "{output}"])
//!         .build()?;
//!     let job = ProcessJob::new("/data/metadata/42", "faust_1808");
//!     let report = FulltextGenerator::new(config).run(&job)?;
//!     eprintln!("{} pages from {} PDFs", report.pages_generated, report.pdfs_processed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fulltext-gen` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! fulltext-generation = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    GenerationConfig, GenerationConfigBuilder, LayoutVariant, PluginConfig, RenderBackend,
    StepConfigBlock,
};
pub use error::{FulltextError, SourceError, StorageError};
pub use generate::{FulltextGenerator, SourceKind};
pub use job::{Job, ProcessJob};
pub use output::{RunReport, SourceFailure, StepOutcome};
pub use pipeline::{CommandRunner, PdfConverter};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::{LocalStorage, Storage};
