use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum TransportError {
    #[error(transparent)]
    #[diagnostic(
        code(pgrest_http::network),
        help("Check that the endpoint is reachable and the URL is correct")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("Failed to read response body: {0}")]
    #[diagnostic(code(pgrest_http::body))]
    Body(#[from] std::io::Error),

    #[error("Request task failed: {0}")]
    #[diagnostic(code(pgrest_http::task))]
    Task(String),

    #[error("{0}")]
    #[diagnostic(code(pgrest_http::custom))]
    Custom(String),
}

impl From<ureq::Error> for TransportError {
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ureq_error() {
        let err: TransportError = ureq::Error::ConnectionFailed.into();
        assert!(matches!(err, TransportError::Network(_)));
    }

    #[test]
    fn test_body_error_message() {
        let err: TransportError =
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream closed").into();
        assert_eq!(err.to_string(), "Failed to read response body: stream closed");
    }

    #[test]
    fn test_task_error_message() {
        let err = TransportError::Task("cancelled".to_string());
        assert_eq!(err.to_string(), "Request task failed: cancelled");
    }

    #[test]
    fn test_custom_error_message() {
        let err = TransportError::Custom("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
    }
}
