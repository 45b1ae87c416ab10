use serde::{Deserialize, Serialize};

/// Path of the statement processing endpoint, relative to the service root.
pub const PROCESS_STATEMENT_PATH: &str = "/api/process-statement";
/// Name under which the filled form is delivered.
pub const FILLED_FORM_FILENAME: &str = "filled_k4.pdf";
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Multipart part names of the processing request.
pub mod field {
    pub const FILE: &str = "file";
    pub const TAX_YEAR: &str = "tax_year";
    pub const BROKER_NAME: &str = "broker_name";
    pub const ACCOUNT_NUMBER: &str = "account_number";
    pub const TAXPAYER_NAME: &str = "taxpayer_name";
    pub const TAXPAYER_SIN: &str = "taxpayer_sin";

    /// Every part of a request, in the order they are sent.
    pub const ALL: [&str; 6] = [
        FILE,
        TAX_YEAR,
        BROKER_NAME,
        ACCOUNT_NUMBER,
        TAXPAYER_NAME,
        TAXPAYER_SIN,
    ];
}

/// Body of a successful processing response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatementResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Base64 (standard alphabet) encoding of the filled PDF.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_content: Option<String>,
}
