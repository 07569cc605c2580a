//! PDF handling: drive the converter for one source and advance the counter.

use crate::config::GenerationConfig;
use crate::error::FulltextError;
use crate::pipeline::PdfConverter;
use crate::storage::Storage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The four directories a PDF source writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    pub text: PathBuf,
    pub pdf: PathBuf,
    pub alto: PathBuf,
    pub images: PathBuf,
}

impl OutputDirs {
    /// In creation order.
    pub fn all(&self) -> [&Path; 4] {
        [&self.text, &self.pdf, &self.alto, &self.images]
    }
}

/// The variant-dependent knobs of PDF handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfSteps {
    /// Write single-page PDFs before rendering images.
    pub split_first: bool,
    /// Delete all images of the source but the first after ALTO generation.
    pub keep_only_first_image: bool,
}

impl From<&GenerationConfig> for PdfSteps {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            split_first: config.variant.splits_before_render(),
            keep_only_first_image: config.keep_only_first_image,
        }
    }
}

/// Convert one PDF source. Artifacts are numbered from `counter`; returns
/// the counter value for the next source.
pub fn process_pdf(
    converter: &dyn PdfConverter,
    storage: &dyn Storage,
    steps: PdfSteps,
    source: &Path,
    dirs: &OutputDirs,
    counter: u32,
) -> Result<u32, FulltextError> {
    info!("Processing PDF {} from page {}", source.display(), counter);

    let texts = converter.write_full_text(source, &dirs.text, counter)?;
    debug!("Wrote {} text files", texts.len());

    let (pdfs, images) = if steps.split_first {
        let pdfs = converter.write_single_page_pdfs(source, &dirs.pdf, counter)?;
        let images = converter.write_images(source, &dirs.images, counter)?;
        (pdfs, images)
    } else {
        let images = converter.write_images(source, &dirs.images, counter)?;
        let pdfs = converter.write_single_page_pdfs(source, &dirs.pdf, counter)?;
        (pdfs, images)
    };

    for (i, page_pdf) in pdfs.iter().enumerate() {
        let image = images.get(i).map(PathBuf::as_path);
        let alto = converter.write_alto(page_pdf, &dirs.alto, image)?;
        debug!("Wrote {}", alto.display());
    }

    let advanced = pdfs.len().max(images.len()) as u32;

    if steps.keep_only_first_image {
        for image in images.iter().skip(1) {
            storage
                .delete_file(image)
                .map_err(|source| FulltextError::CleanupFailed {
                    path: image.clone(),
                    source,
                })?;
        }
        if images.len() > 1 {
            debug!("Removed {} page images", images.len() - 1);
        }
    }

    info!(
        "{}: {} pages, {} images",
        source.display(),
        pdfs.len(),
        images.len()
    );
    Ok(counter + advanced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::page_file_name;
    use crate::storage::LocalStorage;
    use std::sync::Mutex;

    /// Writes empty files; `pages` per source, `images` images.
    struct Fake {
        pages: u32,
        images: u32,
        calls: Mutex<Vec<String>>,
        altos: Mutex<Vec<(PathBuf, Option<PathBuf>)>>,
    }

    impl Fake {
        fn new(pages: u32, images: u32) -> Self {
            Self {
                pages,
                images,
                calls: Mutex::new(Vec::new()),
                altos: Mutex::new(Vec::new()),
            }
        }

        fn touch(dir: &Path, first: u32, n: u32, ext: &str) -> Vec<PathBuf> {
            (0..n)
                .map(|i| {
                    let p = dir.join(page_file_name(first + i, ext));
                    std::fs::write(&p, b"").unwrap();
                    p
                })
                .collect()
        }
    }

    impl PdfConverter for Fake {
        fn write_full_text(&self, _: &Path, dir: &Path, first: u32) -> Result<Vec<PathBuf>, FulltextError> {
            self.calls.lock().unwrap().push("text".into());
            Ok(Self::touch(dir, first, self.pages, "txt"))
        }

        fn write_single_page_pdfs(&self, _: &Path, dir: &Path, first: u32) -> Result<Vec<PathBuf>, FulltextError> {
            self.calls.lock().unwrap().push("split".into());
            Ok(Self::touch(dir, first, self.pages, "pdf"))
        }

        fn write_images(&self, _: &Path, dir: &Path, first: u32) -> Result<Vec<PathBuf>, FulltextError> {
            self.calls.lock().unwrap().push("render".into());
            Ok(Self::touch(dir, first, self.images, "tif"))
        }

        fn write_alto(&self, page_pdf: &Path, dir: &Path, image: Option<&Path>) -> Result<PathBuf, FulltextError> {
            self.altos
                .lock()
                .unwrap()
                .push((page_pdf.to_path_buf(), image.map(Path::to_path_buf)));
            let stem = page_pdf.file_stem().unwrap().to_string_lossy().into_owned();
            let path = dir.join(format!("{stem}.xml"));
            std::fs::write(&path, b"").unwrap();
            Ok(path)
        }
    }

    fn dirs(root: &Path) -> OutputDirs {
        let dirs = OutputDirs {
            text: root.join("txt"),
            pdf: root.join("pdf"),
            alto: root.join("alto"),
            images: root.join("img"),
        };
        for d in dirs.all() {
            std::fs::create_dir_all(d).unwrap();
        }
        dirs
    }

    fn count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    const THUMBS: PdfSteps = PdfSteps {
        split_first: true,
        keep_only_first_image: true,
    };
    const MEDIA: PdfSteps = PdfSteps {
        split_first: false,
        keep_only_first_image: false,
    };

    #[test]
    fn counter_advances_by_page_count() {
        let tmp = tempfile::tempdir().unwrap();
        let d = dirs(tmp.path());
        let fake = Fake::new(3, 3);
        let next = process_pdf(&fake, &LocalStorage, MEDIA, Path::new("a.pdf"), &d, 1).unwrap();
        assert_eq!(next, 4);
        assert!(d.pdf.join("00000003.pdf").exists());
    }

    #[test]
    fn counter_uses_the_larger_artifact_count() {
        let tmp = tempfile::tempdir().unwrap();
        let d = dirs(tmp.path());
        let fake = Fake::new(2, 5);
        let next = process_pdf(&fake, &LocalStorage, MEDIA, Path::new("a.pdf"), &d, 10).unwrap();
        assert_eq!(next, 15);
    }

    #[test]
    fn step_order_follows_variant() {
        let tmp = tempfile::tempdir().unwrap();
        let d = dirs(tmp.path());

        let fake = Fake::new(1, 1);
        process_pdf(&fake, &LocalStorage, THUMBS, Path::new("a.pdf"), &d, 1).unwrap();
        assert_eq!(*fake.calls.lock().unwrap(), vec!["text", "split", "render"]);

        let fake = Fake::new(1, 1);
        process_pdf(&fake, &LocalStorage, MEDIA, Path::new("a.pdf"), &d, 2).unwrap();
        assert_eq!(*fake.calls.lock().unwrap(), vec!["text", "render", "split"]);
    }

    #[test]
    fn alto_pairs_pdf_with_image_by_index() {
        let tmp = tempfile::tempdir().unwrap();
        let d = dirs(tmp.path());
        let fake = Fake::new(3, 2);
        process_pdf(&fake, &LocalStorage, MEDIA, Path::new("a.pdf"), &d, 1).unwrap();

        let altos = fake.altos.lock().unwrap();
        assert_eq!(altos.len(), 3);
        assert_eq!(altos[0].1, Some(d.images.join("00000001.tif")));
        assert_eq!(altos[1].1, Some(d.images.join("00000002.tif")));
        assert_eq!(altos[2].1, None);
    }

    #[test]
    fn cleanup_keeps_only_first_image() {
        let tmp = tempfile::tempdir().unwrap();
        let d = dirs(tmp.path());
        let fake = Fake::new(4, 4);
        process_pdf(&fake, &LocalStorage, THUMBS, Path::new("a.pdf"), &d, 1).unwrap();

        assert_eq!(count(&d.images), 1);
        assert!(d.images.join("00000001.tif").exists());
        assert_eq!(count(&d.pdf), 4);
        assert_eq!(count(&d.alto), 4);
        assert_eq!(count(&d.text), 4);
    }

    #[test]
    fn media_keeps_every_image() {
        let tmp = tempfile::tempdir().unwrap();
        let d = dirs(tmp.path());
        let fake = Fake::new(4, 4);
        process_pdf(&fake, &LocalStorage, MEDIA, Path::new("a.pdf"), &d, 1).unwrap();
        assert_eq!(count(&d.images), 4);
    }

    #[test]
    fn failed_delete_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let d = dirs(tmp.path());

        struct Deleted(Fake);
        impl PdfConverter for Deleted {
            fn write_full_text(&self, s: &Path, d: &Path, f: u32) -> Result<Vec<PathBuf>, FulltextError> {
                self.0.write_full_text(s, d, f)
            }
            fn write_single_page_pdfs(&self, s: &Path, d: &Path, f: u32) -> Result<Vec<PathBuf>, FulltextError> {
                self.0.write_single_page_pdfs(s, d, f)
            }
            fn write_images(&self, s: &Path, d: &Path, f: u32) -> Result<Vec<PathBuf>, FulltextError> {
                let images = self.0.write_images(s, d, f)?;
                std::fs::remove_file(&images[1]).unwrap();
                Ok(images)
            }
            fn write_alto(&self, p: &Path, d: &Path, i: Option<&Path>) -> Result<PathBuf, FulltextError> {
                self.0.write_alto(p, d, i)
            }
        }

        let err = process_pdf(&Deleted(Fake::new(2, 2)), &LocalStorage, THUMBS, Path::new("a.pdf"), &d, 1)
            .unwrap_err();
        assert!(matches!(err, FulltextError::CleanupFailed { .. }));
    }

    #[test]
    fn steps_from_config() {
        let c = GenerationConfig::default();
        assert_eq!(PdfSteps::from(&c), THUMBS);
    }
}
