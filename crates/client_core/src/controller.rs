//! Async driver for the submit-and-download workflow.

use std::time::{Duration, Instant};

use shared::domain::{FieldUpdate, FormFields, StatementFile};
use tracing::{debug, info, warn};

use crate::{
    config::DEFAULT_REQUEST_TIMEOUT_SECS,
    download::DownloadSink,
    error::SubmissionError,
    payload::PdfDocument,
    state::{reduce, SubmissionEvent, SubmissionOutcome, SubmissionState},
    transport::{RequestContext, StatementRequest, StatementService},
};

/// Runs one accepted submission to its outcome: request, decode, deliver.
///
/// Every failure is folded into [`SubmissionOutcome::Failed`].
pub async fn run_submission<S, D>(
    service: &S,
    sink: &D,
    request: &StatementRequest,
    ctx: &RequestContext,
) -> SubmissionOutcome
where
    S: StatementService + ?Sized,
    D: DownloadSink + ?Sized,
{
    match submit_and_deliver(service, sink, request, ctx).await {
        Ok(document) => {
            info!(
                file_name = document.file_name(),
                size_bytes = document.size_bytes(),
                "statement processed"
            );
            SubmissionOutcome::Delivered {
                file_name: document.file_name().to_string(),
                size_bytes: document.size_bytes(),
            }
        }
        Err(err) => {
            warn!(error = %err, timeout = err.is_timeout(), "statement submission failed");
            SubmissionOutcome::Failed(err)
        }
    }
}

async fn submit_and_deliver<S, D>(
    service: &S,
    sink: &D,
    request: &StatementRequest,
    ctx: &RequestContext,
) -> Result<PdfDocument, SubmissionError>
where
    S: StatementService + ?Sized,
    D: DownloadSink + ?Sized,
{
    let response = service.process_statement(request, ctx).await?;
    let encoded = response
        .pdf_content
        .ok_or(SubmissionError::MissingPdfContent)?;
    let document = PdfDocument::from_base64(&encoded)?;
    sink.deliver(&document).await?;
    Ok(document)
}

/// Owns the form state of one session and drives submissions through a
/// [`StatementService`] and a [`DownloadSink`].
pub struct SubmissionController<S, D> {
    service: S,
    sink: D,
    timeout: Duration,
    state: SubmissionState,
}

impl<S, D> SubmissionController<S, D>
where
    S: StatementService,
    D: DownloadSink,
{
    pub fn new(service: S, sink: D, fields: FormFields) -> Self {
        Self {
            service,
            sink,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            state: SubmissionState::new(fields),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    fn apply(&mut self, event: SubmissionEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, event);
    }

    pub fn update_field(&mut self, update: FieldUpdate) {
        self.apply(SubmissionEvent::FieldChanged(update));
    }

    pub fn select_file(&mut self, file: Option<StatementFile>) {
        self.apply(SubmissionEvent::FileSelected(file));
    }

    pub fn dismiss_notification(&mut self) {
        self.apply(SubmissionEvent::NotificationDismissed);
    }

    pub fn tick(&mut self, now: Instant) {
        self.apply(SubmissionEvent::Tick(now));
    }

    /// Submits the current form. Returns `None` without any network traffic
    /// when no file is selected or a request is already in flight.
    pub async fn submit(&mut self) -> Option<SubmissionOutcome> {
        if !self.state.can_submit() {
            debug!(
                has_file = self.state.file.is_some(),
                busy = self.state.is_busy(),
                "submit ignored"
            );
            return None;
        }
        let file = self.state.file.clone()?;
        let request = StatementRequest {
            fields: self.state.fields.clone(),
            file,
        };

        self.apply(SubmissionEvent::SubmitStarted);
        let guard = InFlightGuard::new(&mut self.state);
        let ctx = RequestContext::with_timeout(self.timeout);
        let outcome = run_submission(&self.service, &self.sink, &request, &ctx).await;
        guard.settle(outcome.clone());
        Some(outcome)
    }
}

/// Settles the state even when the submitting future is dropped mid-request.
struct InFlightGuard<'a> {
    state: &'a mut SubmissionState,
    settled: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(state: &'a mut SubmissionState) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, outcome: SubmissionOutcome) {
        self.apply(outcome);
        self.settled = true;
    }

    fn apply(&mut self, outcome: SubmissionOutcome) {
        let state = std::mem::take(self.state);
        *self.state = reduce(
            state,
            SubmissionEvent::Settled {
                outcome,
                at: Instant::now(),
            },
        );
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.apply(SubmissionOutcome::Failed(SubmissionError::Cancelled));
        }
    }
}
