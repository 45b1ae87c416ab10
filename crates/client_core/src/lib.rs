use std::path::Path;

use anyhow::{Context, Result};
use shared::domain::StatementFile;

pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod payload;
pub mod state;
pub mod transport;

pub use config::{load_settings, Settings, SettingsError};
pub use controller::{run_submission, SubmissionController};
pub use download::{DownloadSink, FileDownloadSink};
pub use error::{SubmissionError, TIMEOUT_MESSAGE};
pub use payload::PdfDocument;
pub use state::{
    reduce, RequestState, SubmissionEvent, SubmissionOutcome, SubmissionState,
    NOTIFICATION_DISPLAY_DURATION, SUCCESS_MESSAGE,
};
pub use transport::{HttpStatementService, RequestContext, StatementRequest, StatementService};

/// Reads a statement from disk, keeping its file name for the upload.
pub async fn read_statement_file(path: &Path) -> Result<StatementFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read statement '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("statement path '{}' has no file name", path.display()))?;
    Ok(StatementFile::new(file_name, bytes))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
