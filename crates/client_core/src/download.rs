use std::{
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::info;

use crate::{error::SubmissionError, payload::PdfDocument};

/// Destination for a filled form once it has been decoded.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, document: &PdfDocument) -> Result<(), SubmissionError>;
}

/// Writes documents into a directory under their own file name.
///
/// Bytes are staged in a temporary file next to the target and renamed into
/// place, so a failed write never leaves a truncated `filled_k4.pdf` behind
/// and the staging file is removed on every path that does not persist it.
#[derive(Debug, Clone)]
pub struct FileDownloadSink {
    dir: PathBuf,
}

impl FileDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn destination_for(&self, document: &PdfDocument) -> PathBuf {
        self.dir.join(document.file_name())
    }
}

fn write_staged(dir: &Path, file_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let mut staged = tempfile::Builder::new()
        .prefix(".k4filler-")
        .suffix(".part")
        .tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;

    let target = dir.join(file_name);
    staged.persist(&target).map_err(|err| err.error)?;
    Ok(target)
}

#[async_trait]
impl DownloadSink for FileDownloadSink {
    async fn deliver(&self, document: &PdfDocument) -> Result<(), SubmissionError> {
        let dir = self.dir.clone();
        let file_name = document.file_name().to_string();
        let bytes = document.bytes().to_vec();

        let written = tokio::task::spawn_blocking({
            let file_name = file_name.clone();
            move || write_staged(&dir, &file_name, &bytes)
        })
        .await
        .map_err(|err| SubmissionError::Download {
            file_name: file_name.clone(),
            reason: err.to_string(),
        })?;

        let path = written.map_err(|err| SubmissionError::Download {
            file_name: file_name.clone(),
            reason: err.to_string(),
        })?;
        info!(
            path = %path.display(),
            size_bytes = document.size_bytes(),
            "saved filled form"
        );
        Ok(())
    }
}
