//! Error types for browser control, capture and output

use crate::capture::decoder::RawPage;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Failed to launch the browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Failed to attach to a running browser
    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    /// Tab lookup or creation failed
    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// The event source refused a subscribe/enable/unsubscribe call
    #[error("Event source error: {0}")]
    EventSource(String),

    /// Operation attempted in the wrong pipeline phase
    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),

    /// No captured records were found in an output directory
    #[error("No captured records found in {}", .0.display())]
    NoRecords(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Body retrieval failed for a single request id
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to fetch body for request {request_id}: {reason}")]
pub struct FetchError {
    pub request_id: String,
    pub reason: String,
}

impl FetchError {
    pub fn new(request_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            reason: reason.into(),
        }
    }
}

/// A fetched body could not be turned into an envelope
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that is not an object
    #[error("payload is not an envelope object (found {0})")]
    NotAnEnvelope(&'static str),
}

/// Per-page failure; never fatal to the pipeline
#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Envelope decoded but reported a non-success status
    #[error("page rejected with status {}", status_text(.status))]
    Rejected { status: Option<i64>, page: Box<RawPage> },
}

fn status_text(status: &Option<i64>) -> String {
    status.map_or_else(|| "<missing>".to_string(), |s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::new("1000.42", "No resource with given identifier found");
        assert_eq!(
            err.to_string(),
            "Failed to fetch body for request 1000.42: No resource with given identifier found"
        );
    }

    #[test]
    fn test_rejected_display() {
        let page = RawPage::from_envelope(serde_json::json!({"status_code": 8})).unwrap();
        let err = PageError::Rejected {
            status: page.status_code,
            page: Box::new(page.clone()),
        };
        assert_eq!(err.to_string(), "page rejected with status 8");

        let err = PageError::Rejected {
            status: None,
            page: Box::new(page),
        };
        assert_eq!(err.to_string(), "page rejected with status <missing>");
    }

    #[test]
    fn test_page_error_from_decode() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PageError = DecodeError::from(json_err).into();
        assert!(matches!(err, PageError::Decode(DecodeError::Json(_))));
    }
}
