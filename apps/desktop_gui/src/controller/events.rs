//! Events reported by the backend worker to the UI thread.

use client_core::SubmissionOutcome;
use shared::domain::StatementFile;

#[derive(Debug)]
pub enum UiEvent {
    Info(String),
    StatementLoaded(StatementFile),
    StatementLoadFailed(String),
    SubmissionSettled(SubmissionOutcome),
    /// The worker cannot serve commands; nothing queued will be answered.
    WorkerFailed(String),
}
