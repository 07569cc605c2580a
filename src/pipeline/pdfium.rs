//! The production [`PdfConverter`]: pdfium for reading, `lopdf` for
//! splitting, pdfium or Ghostscript for rasterising.
//!
//! The converter holds no library handle; every operation binds pdfium
//! itself. The library is looked up in this order: the configured path,
//! `PDFIUM_LIB_PATH`, then the system library search path.

use crate::config::{GenerationConfig, RenderBackend};
use crate::error::FulltextError;
use crate::pipeline::render::{self, RenderSettings};
use crate::pipeline::{alto, split, text, PdfConverter};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an installed pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium, preferring an explicit library path.
///
/// `library` may name the shared library itself or the directory that holds
/// it.
pub fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, FulltextError> {
    let explicit = library
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

    let bindings = match explicit {
        Some(path) => {
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| FulltextError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// [`PdfConverter`] backed by pdfium, `lopdf` and optionally Ghostscript.
#[derive(Debug, Clone)]
pub struct PdfiumConverter {
    library: Option<PathBuf>,
    backend: RenderBackend,
    clean_text: bool,
    render: RenderSettings,
}

impl PdfiumConverter {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            library: config.pdfium_library.clone(),
            backend: config.render_backend,
            clean_text: config.clean_text,
            render: RenderSettings {
                dpi: config.dpi,
                extension: config.image_format.clone(),
                temp_root: config.temp_root(),
                ghostscript_binary: config.ghostscript_binary.clone(),
            },
        }
    }

    fn pdfium(&self) -> Result<Pdfium, FulltextError> {
        bind_pdfium(self.library.as_deref())
    }
}

impl PdfConverter for PdfiumConverter {
    fn write_full_text(
        &self,
        source: &Path,
        text_dir: &Path,
        first_page: u32,
    ) -> Result<Vec<PathBuf>, FulltextError> {
        text::write_full_text(&self.pdfium()?, source, text_dir, first_page, self.clean_text)
    }

    fn write_single_page_pdfs(
        &self,
        source: &Path,
        pdf_dir: &Path,
        first_page: u32,
    ) -> Result<Vec<PathBuf>, FulltextError> {
        split::write_single_page_pdfs(source, pdf_dir, first_page)
    }

    fn write_images(
        &self,
        source: &Path,
        image_dir: &Path,
        first_page: u32,
    ) -> Result<Vec<PathBuf>, FulltextError> {
        match self.backend {
            RenderBackend::Pdfium => {
                render::render_with_pdfium(&self.pdfium()?, source, image_dir, first_page, &self.render)
            }
            RenderBackend::Ghostscript => {
                render::render_with_ghostscript(source, image_dir, first_page, &self.render)
            }
        }
    }

    fn write_alto(
        &self,
        page_pdf: &Path,
        alto_dir: &Path,
        image: Option<&Path>,
    ) -> Result<PathBuf, FulltextError> {
        alto::write_alto_file(&self.pdfium()?, page_pdf, alto_dir, image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutVariant;

    #[test]
    fn converter_takes_render_settings_from_config() {
        let config = GenerationConfig::builder()
            .variant(LayoutVariant::Media)
            .dpi(400)
            .image_format("png")
            .render_backend(RenderBackend::Ghostscript)
            .temp_dir("/var/tmp/goobi")
            .build()
            .unwrap();
        let converter = PdfiumConverter::new(&config);
        assert_eq!(converter.render.dpi, 400);
        assert_eq!(converter.render.extension, "png");
        assert_eq!(converter.render.temp_root, PathBuf::from("/var/tmp/goobi"));
        assert_eq!(converter.backend, RenderBackend::Ghostscript);
    }

    #[test]
    fn binding_a_missing_library_fails_cleanly() {
        let err = bind_pdfium(Some(Path::new("/nonexistent/libpdfium.so"))).unwrap_err();
        assert!(matches!(err, FulltextError::PdfiumBindingFailed(_)));
    }
}
