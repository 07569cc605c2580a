//! Configuration types for fulltext generation.
//!
//! All run behaviour is controlled through [`GenerationConfig`], built via
//! its [`GenerationConfigBuilder`]. Hosts that keep per-project/per-step
//! settings in a file use [`PluginConfig`], which selects the block matching
//! a (project, step) pair and turns it into a builder.
//!
//! # Layout variants
//! Two layouts are in use on production systems. They differ in where page
//! images go, in which order images and single-page PDFs are produced, and in
//! whether the extra page images are discarded afterwards. [`LayoutVariant`]
//! picks a preset; every knob it controls can still be overridden.

use crate::error::FulltextError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the source path in an EPUB command template.
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder replaced by the destination path in an EPUB command template.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Configuration for one fulltext generation run.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use fulltext_generation::{GenerationConfig, LayoutVariant};
///
/// let config = GenerationConfig::builder()
///     .variant(LayoutVariant::Media)
///     .dpi(300)
///     .epub_command(["ebook-convert", "{input}", "{output}"])
///     .build()
///     .unwrap();
/// assert!(!config.keep_only_first_image);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Output layout preset. Default: [`LayoutVariant::Thumbs`].
    pub variant: LayoutVariant,

    /// Rendering DPI for page images. Range: 72–1200. Default: 300.
    pub dpi: u32,

    /// File extension of the rendered page images. Default: `tif`.
    pub image_format: String,

    /// Encoding of the extracted text files. Only UTF-8 is supported.
    pub text_encoding: String,

    /// Normalise extracted page text before writing it. Default: true.
    pub clean_text: bool,

    /// Delete every generated page image of a source except the first once
    /// ALTO files exist. Default: on for `Thumbs`, off for `Media`.
    pub keep_only_first_image: bool,

    /// Rasterisation backend. Default: [`RenderBackend::Pdfium`].
    pub render_backend: RenderBackend,

    /// Ghostscript executable used by [`RenderBackend::Ghostscript`].
    pub ghostscript_binary: String,

    /// Explicit pdfium library (file or directory). Falls back to
    /// `PDFIUM_LIB_PATH`, then to the system library.
    pub pdfium_library: Option<PathBuf>,

    /// Parent of the temporary working directories used while rendering.
    /// Default: the system temporary directory.
    pub temp_dir: Option<PathBuf>,

    /// Command template for EPUB-to-text conversion. `{input}` and `{output}`
    /// tokens are substituted. Empty means EPUB sources cannot be converted.
    pub epub_command: Vec<String>,

    /// Optional per-source progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let variant = LayoutVariant::default();
        Self {
            variant,
            dpi: 300,
            image_format: "tif".to_string(),
            text_encoding: "utf-8".to_string(),
            clean_text: true,
            keep_only_first_image: variant.keeps_only_first_image(),
            render_backend: RenderBackend::default(),
            ghostscript_binary: "gs".to_string(),
            pdfium_library: None,
            temp_dir: None,
            epub_command: Vec::new(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("variant", &self.variant)
            .field("dpi", &self.dpi)
            .field("image_format", &self.image_format)
            .field("text_encoding", &self.text_encoding)
            .field("clean_text", &self.clean_text)
            .field("keep_only_first_image", &self.keep_only_first_image)
            .field("render_backend", &self.render_backend)
            .field("ghostscript_binary", &self.ghostscript_binary)
            .field("pdfium_library", &self.pdfium_library)
            .field("temp_dir", &self.temp_dir)
            .field("epub_command", &self.epub_command)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn GenerationProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
            cleanup_override: None,
        }
    }

    /// Directory that holds the temporary rendering workspaces.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
    cleanup_override: Option<bool>,
}

impl GenerationConfigBuilder {
    /// Select a layout preset. Resets `keep_only_first_image` to the preset's
    /// value unless it was set explicitly.
    pub fn variant(mut self, variant: LayoutVariant) -> Self {
        self.config.variant = variant;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn image_format(mut self, ext: impl Into<String>) -> Self {
        self.config.image_format = ext.into().trim_start_matches('.').to_lowercase();
        self
    }

    pub fn text_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.config.text_encoding = encoding.into();
        self
    }

    pub fn clean_text(mut self, v: bool) -> Self {
        self.config.clean_text = v;
        self
    }

    pub fn keep_only_first_image(mut self, v: bool) -> Self {
        self.cleanup_override = Some(v);
        self
    }

    pub fn render_backend(mut self, backend: RenderBackend) -> Self {
        self.config.render_backend = backend;
        self
    }

    pub fn ghostscript_binary(mut self, binary: impl Into<String>) -> Self {
        self.config.ghostscript_binary = binary.into();
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn temp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(path.into());
        self
    }

    pub fn epub_command<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.epub_command = tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<GenerationConfig, FulltextError> {
        self.config.keep_only_first_image = self
            .cleanup_override
            .unwrap_or_else(|| self.config.variant.keeps_only_first_image());

        let c = &self.config;
        if c.dpi < 72 || c.dpi > 1200 {
            return Err(FulltextError::InvalidConfig(format!(
                "DPI must be 72–1200, got {}",
                c.dpi
            )));
        }
        if image::ImageFormat::from_extension(&c.image_format).is_none()
            || !SUPPORTED_IMAGE_FORMATS.contains(&c.image_format.as_str())
        {
            return Err(FulltextError::InvalidConfig(format!(
                "Unsupported image format '{}' (expected one of {})",
                c.image_format,
                SUPPORTED_IMAGE_FORMATS.join(", ")
            )));
        }
        let encoding = c.text_encoding.to_lowercase().replace('_', "-");
        if encoding != "utf-8" && encoding != "utf8" {
            return Err(FulltextError::InvalidConfig(format!(
                "Text encoding must be UTF-8, got '{}'",
                c.text_encoding
            )));
        }
        if c.ghostscript_binary.trim().is_empty() {
            return Err(FulltextError::InvalidConfig(
                "Ghostscript binary must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Raster formats the image writers are compiled with.
pub const SUPPORTED_IMAGE_FORMATS: &[&str] = &["tif", "tiff", "png", "jpg", "jpeg"];

// ── Enums ────────────────────────────────────────────────────────────────

/// Output layout preset.
///
/// | Variant | Image directory | Order | Extra images |
/// |---------|-----------------|-------|--------------|
/// | `Thumbs` | `<images>/<title>_thumbs` | split PDFs, then render | deleted |
/// | `Media` | `<thumbs>/<title>_media` | render, then split PDFs | kept |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVariant {
    #[default]
    Thumbs,
    Media,
}

impl LayoutVariant {
    /// Suffix appended to the job title to name the image directory.
    pub fn image_dir_suffix(self) -> &'static str {
        match self {
            LayoutVariant::Thumbs => "_thumbs",
            LayoutVariant::Media => "_media",
        }
    }

    /// Whether single-page PDFs are written before the page images.
    pub fn splits_before_render(self) -> bool {
        matches!(self, LayoutVariant::Thumbs)
    }

    fn keeps_only_first_image(self) -> bool {
        matches!(self, LayoutVariant::Thumbs)
    }
}

/// Which engine rasterises PDF pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackend {
    /// In-process rendering through pdfium. (default)
    #[default]
    Pdfium,
    /// External `gs` process.
    Ghostscript,
}

// ── Plugin configuration file ────────────────────────────────────────────

/// Wildcard accepted in the `project` and `step` lists.
const WILDCARD: &str = "*";

/// The plugin configuration file: a list of blocks, each valid for some
/// projects and workflow steps.
///
/// ```toml
/// [[config]]
/// project = ["*"]
/// step = ["*"]
/// epub_command = ["ebook-convert", "{input}", "{output}"]
///
/// [[config]]
/// project = ["Archive"]
/// step = ["Fulltext"]
/// variant = "media"
/// dpi = 400
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default, rename = "config")]
    pub blocks: Vec<StepConfigBlock>,
}

/// One `[[config]]` block. Unset fields keep the library defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfigBlock {
    #[serde(default)]
    pub project: Vec<String>,
    #[serde(default)]
    pub step: Vec<String>,
    pub variant: Option<LayoutVariant>,
    pub dpi: Option<u32>,
    pub image_format: Option<String>,
    pub text_encoding: Option<String>,
    pub clean_text: Option<bool>,
    pub keep_only_first_image: Option<bool>,
    pub render_backend: Option<RenderBackend>,
    pub ghostscript_binary: Option<String>,
    pub pdfium_library: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub epub_command: Option<Vec<String>>,
}

impl PluginConfig {
    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FulltextError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FulltextError::ConfigFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            FulltextError::ConfigFile { detail, .. } => FulltextError::ConfigFile {
                path: path.to_path_buf(),
                detail,
            },
            other => other,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, FulltextError> {
        toml::from_str(content).map_err(|e| FulltextError::ConfigFile {
            path: PathBuf::new(),
            detail: e.to_string(),
        })
    }

    /// Pick the block for a project and step.
    ///
    /// Precedence: exact project and step, exact project with wildcard step,
    /// wildcard project with exact step, then wildcard for both. Within one
    /// level the first block in the file wins.
    pub fn select(&self, project: &str, step: &str) -> Option<&StepConfigBlock> {
        let levels: [(bool, bool); 4] = [(true, true), (true, false), (false, true), (false, false)];
        levels.iter().find_map(|&(exact_project, exact_step)| {
            self.blocks.iter().find(|b| {
                matches_name(&b.project, project, exact_project)
                    && matches_name(&b.step, step, exact_step)
            })
        })
    }

    /// Build a [`GenerationConfigBuilder`] from the matching block, or from
    /// defaults when nothing matches.
    pub fn builder_for(&self, project: &str, step: &str) -> GenerationConfigBuilder {
        match self.select(project, step) {
            Some(block) => block.apply(GenerationConfig::builder()),
            None => GenerationConfig::builder(),
        }
    }
}

fn matches_name(names: &[String], wanted: &str, exact: bool) -> bool {
    if exact {
        names.iter().any(|n| n == wanted)
    } else {
        names.iter().any(|n| n == WILDCARD)
    }
}

impl StepConfigBlock {
    /// Apply every field set in this block on top of `builder`.
    pub fn apply(&self, mut builder: GenerationConfigBuilder) -> GenerationConfigBuilder {
        if let Some(v) = self.variant {
            builder = builder.variant(v);
        }
        if let Some(v) = self.dpi {
            builder = builder.dpi(v);
        }
        if let Some(ref v) = self.image_format {
            builder = builder.image_format(v.clone());
        }
        if let Some(ref v) = self.text_encoding {
            builder = builder.text_encoding(v.clone());
        }
        if let Some(v) = self.clean_text {
            builder = builder.clean_text(v);
        }
        if let Some(v) = self.keep_only_first_image {
            builder = builder.keep_only_first_image(v);
        }
        if let Some(v) = self.render_backend {
            builder = builder.render_backend(v);
        }
        if let Some(ref v) = self.ghostscript_binary {
            builder = builder.ghostscript_binary(v.clone());
        }
        if let Some(ref v) = self.pdfium_library {
            builder = builder.pdfium_library(v.clone());
        }
        if let Some(ref v) = self.temp_dir {
            builder = builder.temp_dir(v.clone());
        }
        if let Some(ref v) = self.epub_command {
            builder = builder.epub_command(v.iter().cloned());
        }
        builder
    }
}
