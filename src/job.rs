//! The unit of work: one digitized process and its directory layout.
//!
//! The host owns jobs; the generator only reads their path accessors. Hosts
//! implement [`Job`] over their own process model. [`ProcessJob`] covers the
//! common case of a process directory laid out by naming convention.

use std::path::{Path, PathBuf};

/// Read-only view of a job's directories.
pub trait Job: Send + Sync {
    /// Display title, used to name the page image directory.
    fn title(&self) -> &str;

    /// Directory holding the source documents (PDF/EPUB).
    fn source_dir(&self) -> PathBuf;

    /// General images directory of the process.
    fn images_dir(&self) -> PathBuf;

    /// Thumbnail directory of the process.
    fn thumbs_dir(&self) -> PathBuf;

    /// Plain-text OCR results.
    fn text_dir(&self) -> PathBuf;

    /// Single-page PDFs.
    fn pdf_dir(&self) -> PathBuf;

    /// ALTO XML layout files.
    fn alto_dir(&self) -> PathBuf;
}

/// A process directory with the conventional layout:
///
/// ```text
/// <root>/
///   images/<title>_media/     source documents
///   thumbs/
///   ocr/<title>_txt/
///   ocr/<title>_pdf/
///   ocr/<title>_alto/
/// ```
#[derive(Debug, Clone)]
pub struct ProcessJob {
    root: PathBuf,
    title: String,
    source_dir: Option<PathBuf>,
}

impl ProcessJob {
    pub fn new(root: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            title: title.into(),
            source_dir: None,
        }
    }

    /// Read sources from `dir` instead of `images/<title>_media`.
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ocr_dir(&self, suffix: &str) -> PathBuf {
        self.root.join("ocr").join(format!("{}_{}", self.title, suffix))
    }
}

impl Job for ProcessJob {
    fn title(&self) -> &str {
        &self.title
    }

    fn source_dir(&self) -> PathBuf {
        self.source_dir
            .clone()
            .unwrap_or_else(|| self.images_dir().join(format!("{}_media", self.title)))
    }

    fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    fn thumbs_dir(&self) -> PathBuf {
        self.root.join("thumbs")
    }

    fn text_dir(&self) -> PathBuf {
        self.ocr_dir("txt")
    }

    fn pdf_dir(&self) -> PathBuf {
        self.ocr_dir("pdf")
    }

    fn alto_dir(&self) -> PathBuf {
        self.ocr_dir("alto")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_layout() {
        let job = ProcessJob::new("/goobi/metadata/42", "faust_1808");
        assert_eq!(
            job.source_dir(),
            PathBuf::from("/goobi/metadata/42/images/faust_1808_media")
        );
        assert_eq!(
            job.text_dir(),
            PathBuf::from("/goobi/metadata/42/ocr/faust_1808_txt")
        );
        assert_eq!(
            job.pdf_dir(),
            PathBuf::from("/goobi/metadata/42/ocr/faust_1808_pdf")
        );
        assert_eq!(
            job.alto_dir(),
            PathBuf::from("/goobi/metadata/42/ocr/faust_1808_alto")
        );
        assert_eq!(job.thumbs_dir(), PathBuf::from("/goobi/metadata/42/thumbs"));
    }

    #[test]
    fn source_dir_override() {
        let job = ProcessJob::new("/p", "t").with_source_dir("/incoming/t");
        assert_eq!(job.source_dir(), PathBuf::from("/incoming/t"));
        assert_eq!(job.images_dir(), PathBuf::from("/p/images"));
    }
}
