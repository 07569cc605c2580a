//! EPUB handling: hand the file to an external converter.
//!
//! The converter is whatever the command template names (calibre's
//! `ebook-convert`, `epub2txt`, …). The child's standard streams are
//! connected to the null device. The exit code is logged, not acted upon.

use crate::config::{INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER};
use crate::error::SourceError;
use crate::pipeline::CommandRunner;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// A command-line template with `{input}`/`{output}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpubCommand {
    tokens: Vec<String>,
}

impl EpubCommand {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Substitute whole-token placeholders; other tokens pass through.
    pub fn build(&self, input: &Path, output: &Path) -> Vec<String> {
        self.tokens
            .iter()
            .map(|token| match token.as_str() {
                INPUT_PLACEHOLDER => input.display().to_string(),
                OUTPUT_PLACEHOLDER => output.display().to_string(),
                other => other.to_string(),
            })
            .collect()
    }
}

/// `<text_dir>/<source stem>.txt`.
pub fn destination(source: &Path, text_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    text_dir.join(format!("{stem}.txt"))
}

/// Convert one EPUB source into `text_dir`.
///
/// Every failure is returned as a [`SourceError`]; the caller logs it and
/// moves on to the next source.
pub fn process_epub(
    runner: &dyn CommandRunner,
    command: &EpubCommand,
    source: &Path,
    text_dir: &Path,
) -> Result<(), SourceError> {
    if command.is_empty() {
        return Err(SourceError::NoCommand {
            source_file: source.to_path_buf(),
        });
    }

    let target = destination(source, text_dir);
    let argv = command.build(source, &target);
    let program = argv[0].clone();
    info!("Converting {} → {}", source.display(), target.display());
    debug!("Running {:?}", argv);

    match runner.run(&argv) {
        Ok(Some(0)) => debug!("{} finished", program),
        Ok(Some(code)) => warn!("{} exited with code {} for {}", program, code, source.display()),
        Ok(None) => warn!("{} was terminated by a signal", program),
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
            return Err(SourceError::WaitFailed {
                program,
                detail: e.to_string(),
            })
        }
        Err(e) => {
            return Err(SourceError::LaunchFailed {
                program,
                detail: e.to_string(),
            })
        }
    }
    Ok(())
}

/// [`CommandRunner`] that spawns a real child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, argv: &[String]) -> std::io::Result<Option<i32>> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line")
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let status = child.wait()?;
        Ok(status.code())
    }
}
