use thiserror::Error;

/// Shown when the request deadline fires before a response is processed.
pub const TIMEOUT_MESSAGE: &str = "Request timed out. Please try again.";

/// Every way a submission can fail once it has been accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("{0}")]
    Network(String),
    #[error("request deadline exceeded")]
    Timeout,
    #[error("{0}")]
    Server(String),
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),
    #[error("Server response did not include a PDF document")]
    MissingPdfContent,
    #[error("Invalid PDF payload: {0}")]
    InvalidPdfContent(String),
    #[error("Failed to save {file_name}: {reason}")]
    Download { file_name: String, reason: String },
    #[error("Submission was cancelled")]
    Cancelled,
}

impl SubmissionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SubmissionError::Timeout)
    }

    /// Text for the notification raised when this error settles a submission.
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Timeout => TIMEOUT_MESSAGE.to_string(),
            other => format!("Error: {other}"),
        }
    }
}

impl From<reqwest::Error> for SubmissionError {
    fn from(value: reqwest::Error) -> Self {
        SubmissionError::Network(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_is_not_prefixed() {
        assert_eq!(
            SubmissionError::Timeout.user_message(),
            "Request timed out. Please try again."
        );
    }

    #[test]
    fn other_failures_are_prefixed_with_error() {
        assert_eq!(
            SubmissionError::Server("Invalid SIN".to_string()).user_message(),
            "Error: Invalid SIN"
        );
        assert_eq!(
            SubmissionError::Network("connection refused".to_string()).user_message(),
            "Error: connection refused"
        );
        assert_eq!(
            SubmissionError::MissingPdfContent.user_message(),
            "Error: Server response did not include a PDF document"
        );
        assert_eq!(
            SubmissionError::Download {
                file_name: "filled_k4.pdf".to_string(),
                reason: "read-only file system".to_string(),
            }
            .user_message(),
            "Error: Failed to save filled_k4.pdf: read-only file system"
        );
    }
}
