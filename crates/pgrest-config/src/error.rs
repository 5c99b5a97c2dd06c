use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(pgrest_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    #[diagnostic(
        code(pgrest_config::toml_serialize),
        help("Check your configuration structure for invalid values")
    )]
    TomlSerError(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(pgrest_config::io))]
    IoError(#[from] std::io::Error),

    #[error("Missing server URL")]
    #[diagnostic(
        code(pgrest_config::missing_url),
        help("Set `url` in config.toml, export PGREST_URL or pass --url")
    )]
    MissingUrl,

    #[error("Invalid server URL `{url}`: {reason}")]
    #[diagnostic(
        code(pgrest_config::invalid_url),
        help("Use an absolute http(s) URL such as http://localhost:3000")
    )]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid duration: {0}")]
    #[diagnostic(
        code(pgrest_config::invalid_duration),
        help("Use a duration such as `30s`, `1m30s` or `2h`")
    )]
    InvalidDuration(String),

    #[error("Invalid header `{name}`: {reason}")]
    #[diagnostic(code(pgrest_config::invalid_header))]
    InvalidHeader { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
