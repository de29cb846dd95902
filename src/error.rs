//! Error taxonomy for the document pipeline.
//!
//! Every fallible step maps into one of these variants; the HTTP layer
//! translates them into status codes and error-code bodies.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload's extension has no registered extractor.
    #[error("Unsupported file type: {extension}. Only PDF, DOCX, and TXT are supported.")]
    UnsupportedFileType { extension: String },

    /// The file matched a supported format but its parser rejected it.
    #[error("failed to extract text from {filename}: {message}")]
    ExtractionFailed { filename: String, message: String },

    /// An external service (embedding, generation, vector index) could not
    /// be reached or answered with a non-success status.
    #[error("{service} service error: {message}")]
    ServiceUnavailable { service: String, message: String },

    /// An external service answered 2xx but the body was not the expected
    /// shape.
    #[error("invalid response from {service}: {message}")]
    InvalidResponse { service: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn unavailable(service: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
            message: error.to_string(),
        }
    }

    pub fn invalid_response(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_carries_service_and_message() {
        let err = PipelineError::unavailable("embedding", "connection refused");
        match &err {
            PipelineError::ServiceUnavailable { service, message } => {
                assert_eq!(service, "embedding");
                assert_eq!(message, "connection refused");
            }
            other => panic!("expected ServiceUnavailable, got {:?}", other),
        }
        assert_eq!(err.to_string(), "embedding service error: connection refused");
    }

    #[test]
    fn io_errors_convert_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = PipelineError::from(io);
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }
}
