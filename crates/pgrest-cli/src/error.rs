use miette::Diagnostic;
use pgrest::{error::PgrestError, query::QueryError, ConfigError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error("Invalid filter `{0}`")]
    #[diagnostic(
        code(pgrest_cli::invalid_filter),
        help("Filters are written as `column=operator.value`, e.g. `age=gte.18`")
    )]
    InvalidFilter(String),

    #[error("Invalid order `{0}`")]
    #[diagnostic(
        code(pgrest_cli::invalid_order),
        help("Use `column`, `column.desc` or `column.asc.nullsfirst`")
    )]
    InvalidOrder(String),

    #[error("Invalid range `{0}`")]
    #[diagnostic(
        code(pgrest_cli::invalid_range),
        help("Ranges are inclusive and written as `from-to`, e.g. `0-9`")
    )]
    InvalidRange(String),

    #[error("Invalid count mode `{0}`")]
    #[diagnostic(
        code(pgrest_cli::invalid_count),
        help("Use one of: exact, planned, estimated")
    )]
    InvalidCount(String),

    #[error("Invalid header `{0}`")]
    #[diagnostic(
        code(pgrest_cli::invalid_header),
        help("Headers are written as `Name: value`")
    )]
    InvalidHeader(String),

    #[error("Invalid JSON input: {0}")]
    #[diagnostic(code(pgrest_cli::invalid_json))]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(pgrest_cli::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pgrest(#[from] PgrestError),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Pgrest(err.into())
    }
}

impl From<QueryError> for CliError {
    fn from(err: QueryError) -> Self {
        Self::Pgrest(err.into())
    }
}

pub type CliResult<T> = std::result::Result<T, CliError>;
