//! Run entry points: one job in, one [`RunReport`] out.
//!
//! [`FulltextGenerator::run`] is synchronous: every step is file or process
//! I/O and pdfium is not async-aware. Async hosts use
//! [`FulltextGenerator::run_async`], which moves the whole run onto tokio's
//! blocking pool.

use crate::config::GenerationConfig;
use crate::error::FulltextError;
use crate::job::Job;
use crate::output::{RunReport, SourceFailure, StepOutcome};
use crate::pipeline::epub::{self, EpubCommand, ProcessRunner};
use crate::pipeline::pdf::{self, OutputDirs, PdfSteps};
use crate::pipeline::pdfium::PdfiumConverter;
use crate::pipeline::{CommandRunner, PdfConverter};
use crate::storage::{LocalStorage, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// How a source file is handled, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Epub,
    Other,
}

impl SourceKind {
    /// Classify by lower-cased extension.
    pub fn classify(path: &Path) -> Self {
        match path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("pdf") => SourceKind::Pdf,
            Some("epub") => SourceKind::Epub,
            _ => SourceKind::Other,
        }
    }
}

/// Generates full text, single-page PDFs, page images and ALTO for a job.
///
/// Cheap to clone; the conversion seams are shared.
///
/// # Example
/// ```rust,no_run
/// use fulltext_generation::{FulltextGenerator, GenerationConfig, ProcessJob};
///
/// let generator = FulltextGenerator::new(GenerationConfig::default());
/// let report = generator.run(&ProcessJob::new("/data/metadata/42", "faust_1808"))?;
/// println!("{} pages", report.pages_generated);
/// # Ok::<(), fulltext_generation::FulltextError>(())
/// ```
#[derive(Clone)]
pub struct FulltextGenerator {
    config: GenerationConfig,
    converter: Arc<dyn PdfConverter>,
    runner: Arc<dyn CommandRunner>,
    storage: Arc<dyn Storage>,
}

impl FulltextGenerator {
    /// Generator with the production backends: pdfium, child processes and
    /// the local filesystem.
    pub fn new(config: GenerationConfig) -> Self {
        let converter = Arc::new(PdfiumConverter::new(&config));
        Self {
            config,
            converter,
            runner: Arc::new(ProcessRunner),
            storage: Arc::new(LocalStorage),
        }
    }

    pub fn with_converter(mut self, converter: Arc<dyn PdfConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Output directories for `job` under the configured layout variant.
    pub fn output_dirs(&self, job: &dyn Job) -> OutputDirs {
        let variant = self.config.variant;
        let image_parent = if variant.splits_before_render() {
            job.images_dir()
        } else {
            job.thumbs_dir()
        };
        OutputDirs {
            text: job.text_dir(),
            pdf: job.pdf_dir(),
            alto: job.alto_dir(),
            images: image_parent.join(format!("{}{}", job.title(), variant.image_dir_suffix())),
        }
    }

    /// Process every source file of `job`.
    ///
    /// # Errors
    /// Returns `Err(FulltextError)` only for fatal errors:
    /// - the source directory cannot be listed
    /// - an output directory cannot be created
    /// - any step of a PDF source fails
    ///
    /// EPUB failures are recorded in [`RunReport::failures`].
    pub fn run(&self, job: &dyn Job) -> Result<RunReport, FulltextError> {
        let start = Instant::now();
        let source_dir = job.source_dir();
        info!("Generating full text for '{}'", job.title());

        // ── Step 1: List sources ─────────────────────────────────────────
        let sources = self
            .storage
            .list_files(&source_dir)
            .map_err(|source| FulltextError::ListingFailed {
                path: source_dir.clone(),
                source,
            })?;
        debug!("{} files in {}", sources.len(), source_dir.display());

        // ── Step 2: Output directories ───────────────────────────────────
        let dirs = self.output_dirs(job);
        for dir in dirs.all() {
            if !self.storage.exists(dir) {
                self.storage
                    .create_dirs(dir)
                    .map_err(|source| FulltextError::CreateDirFailed {
                        path: dir.to_path_buf(),
                        source,
                    })?;
                debug!("Created {}", dir.display());
            }
        }

        let cb = self.config.progress_callback.as_ref();
        let total = sources.len();
        if let Some(cb) = cb {
            cb.on_run_start(total);
        }

        // ── Step 3: Dispatch ─────────────────────────────────────────────
        let steps = PdfSteps::from(&self.config);
        let epub_command = EpubCommand::new(self.config.epub_command.clone());
        let mut report = RunReport {
            sources_seen: total,
            next_page: 1,
            ..Default::default()
        };

        for (i, source) in sources.iter().enumerate() {
            let index = i + 1;
            let name = display_name(source);

            match SourceKind::classify(source) {
                SourceKind::Pdf => {
                    if let Some(cb) = cb {
                        cb.on_source_start(index, total, &name);
                    }
                    let counter = report.next_page;
                    let next = match pdf::process_pdf(
                        self.converter.as_ref(),
                        self.storage.as_ref(),
                        steps,
                        source,
                        &dirs,
                        counter,
                    ) {
                        Ok(next) => next,
                        Err(e) => {
                            if let Some(cb) = cb {
                                cb.on_source_error(index, total, &name, &e.to_string());
                            }
                            return Err(e);
                        }
                    };
                    report.pdfs_processed += 1;
                    report.pages_generated += next - counter;
                    report.next_page = next;
                    if let Some(cb) = cb {
                        cb.on_source_complete(index, total, &name, (next - counter) as usize);
                    }
                }
                SourceKind::Epub => {
                    if let Some(cb) = cb {
                        cb.on_source_start(index, total, &name);
                    }
                    match epub::process_epub(self.runner.as_ref(), &epub_command, source, &dirs.text) {
                        Ok(()) => {
                            report.epubs_converted += 1;
                            if let Some(cb) = cb {
                                cb.on_source_complete(index, total, &name, 0);
                            }
                        }
                        Err(e) => {
                            warn!("Skipping EPUB {}: {}", source.display(), e);
                            if let Some(cb) = cb {
                                cb.on_source_error(index, total, &name, &e.to_string());
                            }
                            report.failures.push(SourceFailure {
                                source_file: source.clone(),
                                error: e,
                            });
                        }
                    }
                }
                SourceKind::Other => {
                    debug!("Ignoring {}", source.display());
                    if let Some(cb) = cb {
                        cb.on_source_skipped(index, total, &name);
                    }
                    report.skipped.push(source.clone());
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        if let Some(cb) = cb {
            cb.on_run_complete(total, report.handled());
        }
        info!(
            "Finished '{}': {} PDFs ({} pages), {} EPUBs, {} failures, {}ms",
            job.title(),
            report.pdfs_processed,
            report.pages_generated,
            report.epubs_converted,
            report.failures.len(),
            report.duration_ms
        );
        Ok(report)
    }

    /// [`run`](Self::run), reduced to the host's two-valued outcome.
    pub fn execute(&self, job: &dyn Job) -> StepOutcome {
        let result = self.run(job);
        if let Err(ref e) = result {
            error!("Fulltext generation for '{}' failed: {}", job.title(), e);
        }
        StepOutcome::from(&result)
    }

    /// Run on tokio's blocking pool.
    pub async fn run_async<J>(&self, job: J) -> Result<RunReport, FulltextError>
    where
        J: Job + 'static,
    {
        let generator = self.clone();
        tokio::task::spawn_blocking(move || generator.run(&job))
            .await
            .map_err(|e| FulltextError::Internal(format!("spawn_blocking panicked: {}", e)))?
    }
}

impl std::fmt::Debug for FulltextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulltextGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
