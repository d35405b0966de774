use serde::Serialize;
use thiserror::Error;

use crate::analysis::AnalysisFailure;

/// Reason attached to a `Storage` error when an artifact upload yields no handle.
pub const UPLOAD_FAILED: &str = "upload_failed";
/// Reason attached to a `Storage` error when the record store rejects a write.
pub const RECORD_WRITE_FAILED: &str = "record_write_failed";

/// The four failure kinds a submission can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Storage,
    Conversion,
    Analysis,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisFailure),
}

impl IngestError {
    pub fn upload_failed() -> Self {
        IngestError::Storage(UPLOAD_FAILED.to_string())
    }

    pub fn record_write_failed() -> Self {
        IngestError::Storage(RECORD_WRITE_FAILED.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::Validation(_) => ErrorKind::Validation,
            IngestError::Storage(_) => ErrorKind::Storage,
            IngestError::Conversion(_) => ErrorKind::Conversion,
            IngestError::Analysis(_) => ErrorKind::Analysis,
        }
    }

    /// Message suitable for showing to the person who submitted the resume.
    pub fn status_message(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "Please choose a resume file to upload.",
            IngestError::Storage(reason) if reason == RECORD_WRITE_FAILED => {
                "Failed to save your resume. Please try again."
            }
            IngestError::Storage(_) => "Failed to upload file. Please try again.",
            IngestError::Conversion(_) => "Failed to convert your resume to an image. Please try again.",
            IngestError::Analysis(AnalysisFailure::Malformed(_)) => {
                "Error: The analysis returned an unreadable response"
            }
            IngestError::Analysis(_) => "Error: Failed to analyze resume",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            IngestError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(IngestError::upload_failed().kind(), ErrorKind::Storage);
        assert_eq!(IngestError::record_write_failed().kind(), ErrorKind::Storage);
        assert_eq!(
            IngestError::Conversion("x".into()).kind(),
            ErrorKind::Conversion
        );
        assert_eq!(
            IngestError::from(AnalysisFailure::NoResult).kind(),
            ErrorKind::Analysis
        );
    }

    #[test]
    fn test_upload_failed_reason() {
        assert_eq!(
            IngestError::upload_failed(),
            IngestError::Storage("upload_failed".to_string())
        );
        assert_eq!(
            IngestError::upload_failed().to_string(),
            "storage error: upload_failed"
        );
    }

    #[test]
    fn test_status_messages_distinguish_analysis_failures() {
        let no_result = IngestError::from(AnalysisFailure::NoResult);
        let malformed = IngestError::from(AnalysisFailure::Malformed("bad".into()));
        assert_ne!(no_result.status_message(), malformed.status_message());
        assert_ne!(
            IngestError::upload_failed().status_message(),
            IngestError::record_write_failed().status_message()
        );
    }
}
