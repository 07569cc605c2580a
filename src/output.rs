//! Result types returned to the host.

use crate::error::{FulltextError, SourceError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of a completed run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Files found in the source directory.
    pub sources_seen: usize,
    /// PDF sources converted.
    pub pdfs_processed: usize,
    /// EPUB sources whose converter process ran to completion.
    pub epubs_converted: usize,
    /// Files ignored because of their extension.
    pub skipped: Vec<PathBuf>,
    /// EPUB sources that could not be converted.
    pub failures: Vec<SourceFailure>,
    /// Pages the counter advanced by over all PDF sources.
    pub pages_generated: u32,
    /// Counter value the next page would have received.
    pub next_page: u32,
    pub duration_ms: u64,
}

impl RunReport {
    /// Sources handled without error.
    pub fn handled(&self) -> usize {
        self.pdfs_processed + self.epubs_converted
    }
}

/// A non-fatal failure for one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source_file: PathBuf,
    pub error: SourceError,
}

/// Two-valued outcome of a workflow step, as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// The host may move on to the next step.
    Finish,
    /// The host should halt and flag the step.
    Error,
}

impl From<&Result<RunReport, FulltextError>> for StepOutcome {
    fn from(result: &Result<RunReport, FulltextError>) -> Self {
        match result {
            Ok(_) => StepOutcome::Finish,
            Err(_) => StepOutcome::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_result() {
        let ok: Result<RunReport, FulltextError> = Ok(RunReport::default());
        assert_eq!(StepOutcome::from(&ok), StepOutcome::Finish);

        let err: Result<RunReport, FulltextError> = Err(FulltextError::Internal("boom".into()));
        assert_eq!(StepOutcome::from(&err), StepOutcome::Error);
    }

    #[test]
    fn report_serialises_failures() {
        let report = RunReport {
            sources_seen: 2,
            epubs_converted: 1,
            failures: vec![SourceFailure {
                source_file: PathBuf::from("b.epub"),
                error: SourceError::NoCommand {
                    source_file: PathBuf::from("b.epub"),
                },
            }],
            next_page: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sources_seen"], 2);
        assert_eq!(json["failures"][0]["source_file"], "b.epub");
        assert_eq!(report.handled(), 1);
    }
}
