use miette::Diagnostic;
use thiserror::Error;

/// Misuse detected while building a query, before anything is sent.
///
/// Chain methods never fail; the first problem is recorded on the builder
/// and returned by `execute()` instead of issuing a request. Backend and
/// transport failures are not represented here, they resolve into the
/// response envelope.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Failed to serialize value for `{operation}`: {reason}")]
    #[diagnostic(
        code(pgrest_query::serialize),
        help("Values passed to filters and mutations must be representable as JSON")
    )]
    Serialize {
        operation: &'static str,
        reason: String,
    },

    #[error("Invalid argument for `{operation}`: {reason}")]
    #[diagnostic(code(pgrest_query::invalid_argument))]
    InvalidArgument {
        operation: &'static str,
        reason: String,
    },

    #[error("Invalid header `{name}`: {reason}")]
    #[diagnostic(
        code(pgrest_query::invalid_header),
        help("Header names must be HTTP tokens and values must not contain control characters")
    )]
    InvalidHeader { name: String, reason: String },
}

impl QueryError {
    pub(crate) fn serialize(operation: &'static str, err: serde_json::Error) -> Self {
        Self::Serialize {
            operation,
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
