use serde::{Deserialize, Serialize};

/// Message used when a failed response carries no usable `detail`.
pub const SERVER_ERROR_FALLBACK: &str = "Server error";

/// Error body returned by the processing service on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Extracts the `detail` string from a raw error body.
    ///
    /// Bodies that are not JSON, lack the field, or carry a non-string
    /// `detail` (validation errors arrive as arrays) yield `None`.
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        let detail = value.get("detail")?.as_str()?;
        if detail.is_empty() {
            return None;
        }
        Some(Self::new(detail))
    }

    /// The message to surface for a failed response body.
    pub fn message_from_body(body: &[u8]) -> String {
        Self::from_body(body)
            .map(|error| error.detail)
            .unwrap_or_else(|| SERVER_ERROR_FALLBACK.to_string())
    }
}
