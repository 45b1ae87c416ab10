//! HTTP exchange with the statement processing service.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::{FieldName, FormFields, StatementFile},
    error::ErrorDetail,
    protocol::{field, ProcessStatementResponse, PDF_MIME_TYPE, PROCESS_STATEMENT_PATH},
};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::SubmissionError;

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deadline carried into a request. Work still pending when it passes is
/// dropped, which aborts the underlying connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded;

impl RequestContext {
    /// Timeouts too large to represent as an instant saturate to a deadline
    /// roughly thirty years out.
    pub fn with_timeout(timeout: Duration) -> Self {
        let now = Instant::now();
        let deadline = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { deadline }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub async fn run<F: Future>(&self, work: F) -> Result<F::Output, DeadlineExceeded> {
        tokio::time::timeout_at(self.deadline, work)
            .await
            .map_err(|_| DeadlineExceeded)
    }
}

/// One processing request: the statement plus the form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRequest {
    pub fields: FormFields,
    pub file: StatementFile,
}

impl StatementRequest {
    /// Text parts in wire order, paired with their values.
    pub fn text_parts(&self) -> [(&'static str, String); 5] {
        let fields = &self.fields;
        [
            (FieldName::TaxYear.wire_name(), fields.tax_year.to_string()),
            (FieldName::BrokerName.wire_name(), fields.broker_name.clone()),
            (
                FieldName::AccountNumber.wire_name(),
                fields.account_number.clone(),
            ),
            (
                FieldName::TaxpayerName.wire_name(),
                fields.taxpayer_name.clone(),
            ),
            (FieldName::TaxpayerSin.wire_name(), fields.taxpayer_sin.clone()),
        ]
    }
}

#[async_trait]
pub trait StatementService: Send + Sync {
    /// Submits the statement and returns the parsed success body.
    ///
    /// Must stop waiting once `ctx` expires and report
    /// [`SubmissionError::Timeout`].
    async fn process_statement(
        &self,
        request: &StatementRequest,
        ctx: &RequestContext,
    ) -> Result<ProcessStatementResponse, SubmissionError>;
}

pub struct HttpStatementService {
    http: Client,
    endpoint: Url,
}

impl HttpStatementService {
    pub fn new(server_url: &Url) -> Result<Self, url::ParseError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &Url) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            endpoint: endpoint_for(server_url)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Appends the processing path, keeping any path prefix of `server_url`.
pub fn endpoint_for(server_url: &Url) -> Result<Url, url::ParseError> {
    let base = server_url.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}{PROCESS_STATEMENT_PATH}"))
}

fn build_form(request: &StatementRequest) -> Result<Form, SubmissionError> {
    let file_part = Part::bytes(request.file.bytes.clone())
        .file_name(request.file.file_name.clone())
        .mime_str(PDF_MIME_TYPE)?;

    let mut form = Form::new().part(field::FILE, file_part);
    for (name, value) in request.text_parts() {
        form = form.text(name, value);
    }
    Ok(form)
}

#[async_trait]
impl StatementService for HttpStatementService {
    async fn process_statement(
        &self,
        request: &StatementRequest,
        ctx: &RequestContext,
    ) -> Result<ProcessStatementResponse, SubmissionError> {
        let form = build_form(request)?;
        info!(
            endpoint = %self.endpoint,
            file_name = %request.file.file_name,
            size_bytes = request.file.size_bytes(),
            tax_year = request.fields.tax_year,
            timeout_secs = ctx.remaining().as_secs(),
            "submitting statement"
        );

        let exchange = async {
            let response = self
                .http
                .post(self.endpoint.clone())
                .multipart(form)
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match ctx.run(exchange).await {
            Ok(Ok(exchange)) => exchange,
            Ok(Err(err)) => {
                warn!(endpoint = %self.endpoint, error = %err, "statement request failed");
                return Err(err.into());
            }
            Err(DeadlineExceeded) => {
                warn!(endpoint = %self.endpoint, "statement request aborted at deadline");
                return Err(SubmissionError::Timeout);
            }
        };

        if !status.is_success() {
            let message = ErrorDetail::message_from_body(&body);
            warn!(%status, %message, "processing service rejected statement");
            return Err(SubmissionError::Server(message));
        }

        let parsed: ProcessStatementResponse = serde_json::from_slice(&body)
            .map_err(|err| SubmissionError::InvalidResponse(err.to_string()))?;
        debug!(
            %status,
            service_status = parsed.status.as_deref().unwrap_or("-"),
            service_message = parsed.message.as_deref().unwrap_or("-"),
            has_pdf = parsed.pdf_content.is_some(),
            "processing service responded"
        );
        Ok(parsed)
    }
}
