//! CLI binary for fulltext-generation.
//!
//! A thin shim over the library crate that maps CLI flags and an optional
//! plugin configuration file to `GenerationConfig` and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use fulltext_generation::{
    FulltextGenerator, GenerationConfigBuilder, GenerationProgressCallback, LayoutVariant,
    PluginConfig, ProcessJob, ProgressCallback, RenderBackend, RunReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the source files, one log line
/// per source.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Listing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_sources: usize) {
        self.bar.set_length(total_sources as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        self.bar.set_prefix("Generating");
    }

    fn on_source_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_source_complete(&self, index: usize, total: usize, name: &str, pages: usize) {
        let detail = if pages > 0 {
            format!("{pages} pages")
        } else {
            "text".to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&detail)
        ));
        self.bar.inc(1);
    }

    fn on_source_skipped(&self, _index: usize, _total: usize, _name: &str) {
        self.bar.inc(1);
    }

    fn on_source_error(&self, index: usize, total: usize, name: &str, error: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(error)
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, _total_sources: usize, _handled_sources: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate artifacts for a process directory
  fulltext-gen /data/metadata/42 --title faust_1808

  # Older layout: images under thumbs/<title>_media, no image cleanup
  fulltext-gen /data/metadata/42 --title faust_1808 --variant media

  # EPUB conversion through calibre
  fulltext-gen /data/metadata/42 --epub-command ebook-convert \
      --epub-command '{input}' --epub-command '{output}'

  # Settings from a plugin configuration file
  fulltext-gen /data/metadata/42 --config fulltext.toml --project Archive --step OCR

  # JSON report
  fulltext-gen /data/metadata/42 --json > report.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH      Path to libpdfium (file or directory)
  RUST_LOG             Log filter, e.g. fulltext_generation=debug
"#;

/// Generate full text, single-page PDFs, page images and ALTO for a process.
#[derive(Parser, Debug)]
#[command(
    name = "fulltext-gen",
    version,
    about = "Generate OCR-equivalent artifacts from born-digital PDF and EPUB sources",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Process directory holding images/, thumbs/ and ocr/.
    process_dir: PathBuf,

    /// Process title. Default: the process directory's name.
    #[arg(long, env = "FULLTEXT_TITLE")]
    title: Option<String>,

    /// Read sources from this directory instead of images/<title>_media.
    #[arg(long, env = "FULLTEXT_SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Plugin configuration file (TOML).
    #[arg(long, env = "FULLTEXT_CONFIG")]
    config: Option<PathBuf>,

    /// Project name used to select a configuration block.
    #[arg(long, env = "FULLTEXT_PROJECT", default_value = "*")]
    project: String,

    /// Workflow step name used to select a configuration block.
    #[arg(long, env = "FULLTEXT_STEP", default_value = "*")]
    step: String,

    /// Output layout preset.
    #[arg(long, env = "FULLTEXT_VARIANT", value_enum)]
    variant: Option<VariantArg>,

    /// Rendering DPI (72–1200).
    #[arg(long, env = "FULLTEXT_DPI",
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    dpi: Option<u32>,

    /// Page image format: tif, png, jpg.
    #[arg(long, env = "FULLTEXT_IMAGE_FORMAT")]
    image_format: Option<String>,

    /// Rasterisation backend.
    #[arg(long, env = "FULLTEXT_RENDERER", value_enum)]
    renderer: Option<RendererArg>,

    /// EPUB converter command, one token per flag. `{input}` and `{output}`
    /// are substituted.
    #[arg(long = "epub-command", env = "FULLTEXT_EPUB_COMMAND", value_delimiter = ' ')]
    epub_command: Vec<String>,

    /// Parent of temporary rendering directories.
    #[arg(long, env = "FULLTEXT_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Print the run report as JSON.
    #[arg(long, env = "FULLTEXT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FULLTEXT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FULLTEXT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FULLTEXT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    Thumbs,
    Media,
}

impl From<VariantArg> for LayoutVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Thumbs => LayoutVariant::Thumbs,
            VariantArg::Media => LayoutVariant::Media,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RendererArg {
    Pdfium,
    Ghostscript,
}

impl From<RendererArg> for RenderBackend {
    fn from(v: RendererArg) -> Self {
        match v {
            RendererArg::Pdfium => RenderBackend::Pdfium,
            RendererArg::Ghostscript => RenderBackend::Ghostscript,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let builder = base_builder(&cli)?;
    let config = apply_flags(builder, &cli, progress_cb)
        .build()
        .context("Invalid configuration")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let title = match cli.title.clone() {
        Some(t) => t,
        None => cli
            .process_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .context("Cannot derive a title from the process directory; pass --title")?,
    };
    let mut job = ProcessJob::new(&cli.process_dir, title);
    if let Some(ref dir) = cli.source_dir {
        job = job.with_source_dir(dir);
    }

    let report = FulltextGenerator::new(config)
        .run_async(job)
        .await
        .context("Fulltext generation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Start from the matching block of `--config`, or from defaults.
fn base_builder(cli: &Cli) -> Result<GenerationConfigBuilder> {
    match cli.config {
        Some(ref path) => {
            let plugin = PluginConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?;
            Ok(plugin.builder_for(&cli.project, &cli.step))
        }
        None => Ok(fulltext_generation::GenerationConfig::builder()),
    }
}

/// Flags given on the command line win over the configuration file.
fn apply_flags(
    mut builder: GenerationConfigBuilder,
    cli: &Cli,
    progress: Option<ProgressCallback>,
) -> GenerationConfigBuilder {
    if let Some(v) = cli.variant {
        builder = builder.variant(v.into());
    }
    if let Some(dpi) = cli.dpi {
        builder = builder.dpi(dpi);
    }
    if let Some(ref f) = cli.image_format {
        builder = builder.image_format(f.clone());
    }
    if let Some(r) = cli.renderer {
        builder = builder.render_backend(r.into());
    }
    if !cli.epub_command.is_empty() {
        builder = builder.epub_command(cli.epub_command.iter().cloned());
    }
    if let Some(ref d) = cli.temp_dir {
        builder = builder.temp_dir(d.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder
}

fn print_summary(report: &RunReport) {
    let mark = if report.failures.is_empty() {
        green("✔")
    } else {
        yellow("⚠")
    };
    eprintln!(
        "{}  {} PDFs, {} pages  {} EPUBs  {}ms",
        mark,
        bold(&report.pdfs_processed.to_string()),
        report.pages_generated,
        report.epubs_converted,
        report.duration_ms
    );
    if !report.skipped.is_empty() {
        eprintln!("   {}", dim(&format!("{} files skipped", report.skipped.len())));
    }
    for failure in &report.failures {
        eprintln!(
            "   {} {}: {}",
            red("✗"),
            failure.source_file.display(),
            failure.error
        );
    }
}
