//! Error types for the pgrest facade.

use miette::Diagnostic;
use pgrest_config::ConfigError;
use pgrest_query::QueryError;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum PgrestError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),
}

pub type Result<T> = std::result::Result<T, PgrestError>;
