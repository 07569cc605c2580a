//! PDF rasterisation: render every page to an image file.
//!
//! Both backends render into a private temporary workspace and only move
//! finished files into the job's image directory.
//!
//! * [`render_with_pdfium`] renders in-process through pdfium.
//! * [`render_with_ghostscript`] runs an external `gs` process, one call per
//!   source file.

use crate::error::FulltextError;
use crate::pipeline::page_file_name;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, info};

/// Settings shared by both rasterisation backends.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub dpi: u32,
    /// Output extension, e.g. `tif`.
    pub extension: String,
    /// Parent of the temporary workspace.
    pub temp_root: PathBuf,
    pub ghostscript_binary: String,
}

impl RenderSettings {
    fn image_format(&self) -> Result<ImageFormat, FulltextError> {
        ImageFormat::from_extension(&self.extension).ok_or_else(|| {
            FulltextError::InvalidConfig(format!("Unknown image format '{}'", self.extension))
        })
    }

    fn ghostscript_device(&self) -> Result<&'static str, FulltextError> {
        match self.extension.as_str() {
            "tif" | "tiff" => Ok("tiff24nc"),
            "png" => Ok("png16m"),
            "jpg" | "jpeg" => Ok("jpeg"),
            other => Err(FulltextError::InvalidConfig(format!(
                "Ghostscript cannot write '{}' images",
                other
            ))),
        }
    }
}

/// Rasterise every page of `source` with pdfium.
pub fn render_with_pdfium(
    pdfium: &Pdfium,
    source: &Path,
    image_dir: &Path,
    first_page: u32,
    settings: &RenderSettings,
) -> Result<Vec<PathBuf>, FulltextError> {
    let format = settings.image_format()?;
    let workspace = create_workspace(&settings.temp_root)?;

    let document = pdfium
        .load_pdf_from_file(source, None)
        .map_err(|e| FulltextError::PdfRead {
            path: source.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let render_config = PdfRenderConfig::new().scale_page_by_factor(settings.dpi as f32 / 72.0);

    let mut rendered = Vec::new();
    for (offset, page) in document.pages().iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            FulltextError::RasterisationFailed {
                path: source.to_path_buf(),
                page: offset + 1,
                detail: format!("{:?}", e),
            }
        })?;

        // Page images carry no transparency; TIFF/JPEG writers want RGB.
        let image = DynamicImage::ImageRgb8(bitmap.as_image().to_rgb8());
        let path = workspace
            .path()
            .join(page_file_name(first_page + offset as u32, &settings.extension));
        image
            .save_with_format(&path, format)
            .map_err(|e| FulltextError::PdfWrite {
                path: path.clone(),
                detail: e.to_string(),
            })?;
        debug!(
            "Rendered page {} → {}x{} px",
            offset + 1,
            image.width(),
            image.height()
        );
        rendered.push(path);
    }

    let moved = move_into(&rendered, image_dir)?;
    info!("Rendered {} pages of {}", moved.len(), source.display());
    Ok(moved)
}

/// Rasterise every page of `source` with an external Ghostscript process.
pub fn render_with_ghostscript(
    source: &Path,
    image_dir: &Path,
    first_page: u32,
    settings: &RenderSettings,
) -> Result<Vec<PathBuf>, FulltextError> {
    let device = settings.ghostscript_device()?;
    let workspace = create_workspace(&settings.temp_root)?;
    let pattern = workspace
        .path()
        .join(format!("page-%05d.{}", settings.extension));

    let argv = ghostscript_args(device, settings.dpi, &pattern, source);
    debug!("Running {} {:?}", settings.ghostscript_binary, argv);

    let output = Command::new(&settings.ghostscript_binary)
        .args(&argv)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .output()
        .map_err(|e| FulltextError::RasterisationFailed {
            path: source.to_path_buf(),
            page: 0,
            detail: format!("cannot launch '{}': {}", settings.ghostscript_binary, e),
        })?;

    if !output.status.success() {
        return Err(FulltextError::RasterisationFailed {
            path: source.to_path_buf(),
            page: 0,
            detail: format!(
                "{} exited with {}: {}",
                settings.ghostscript_binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    // gs numbers its output page-00001…, so name order is page order.
    let mut pages: Vec<PathBuf> = std::fs::read_dir(workspace.path())
        .and_then(|entries| entries.map(|e| e.map(|e| e.path())).collect())
        .map_err(|e| FulltextError::PdfWrite {
            path: workspace.path().to_path_buf(),
            detail: e.to_string(),
        })?;
    pages.sort();

    let mut renamed = Vec::with_capacity(pages.len());
    for (offset, page) in pages.iter().enumerate() {
        let target = workspace
            .path()
            .join(page_file_name(first_page + offset as u32, &settings.extension));
        rename(page, &target)?;
        renamed.push(target);
    }

    let moved = move_into(&renamed, image_dir)?;
    info!("Ghostscript rendered {} pages of {}", moved.len(), source.display());
    Ok(moved)
}

/// Command-line arguments for one Ghostscript render call.
pub fn ghostscript_args(device: &str, dpi: u32, pattern: &Path, source: &Path) -> Vec<String> {
    vec![
        "-q".to_string(),
        "-dNOPAUSE".to_string(),
        "-dBATCH".to_string(),
        "-dSAFER".to_string(),
        format!("-sDEVICE={device}"),
        format!("-r{dpi}"),
        format!("-sOutputFile={}", pattern.display()),
        source.display().to_string(),
    ]
}

fn create_workspace(temp_root: &Path) -> Result<TempDir, FulltextError> {
    tempfile::Builder::new()
        .prefix("fulltext-render-")
        .tempdir_in(temp_root)
        .map_err(|e| FulltextError::PdfWrite {
            path: temp_root.to_path_buf(),
            detail: format!("cannot create render workspace: {e}"),
        })
}

/// Move finished files into `dir`, keeping their names.
fn move_into(files: &[PathBuf], dir: &Path) -> Result<Vec<PathBuf>, FulltextError> {
    files
        .iter()
        .map(|file| {
            let name = file.file_name().ok_or_else(|| {
                FulltextError::Internal(format!("rendered file without name: {}", file.display()))
            })?;
            let target = dir.join(name);
            rename(file, &target)?;
            Ok(target)
        })
        .collect()
}

/// Rename, falling back to copy + delete across filesystems.
fn rename(from: &Path, to: &Path) -> Result<(), FulltextError> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .and_then(|_| std::fs::remove_file(from))
        .map_err(|e| FulltextError::PdfWrite {
            path: to.to_path_buf(),
            detail: e.to_string(),
        })
}
