use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{
    error::{ConfigError, Result},
    utils::{parse_duration, xdg_config_home},
};

pub const CONFIG_ENV: &str = "PGREST_CONFIG";
pub const URL_ENV: &str = "PGREST_URL";
pub const API_KEY_ENV: &str = "PGREST_API_KEY";
pub const SCHEMA_ENV: &str = "PGREST_SCHEMA";

/// Client configuration.
///
/// Every field is optional in the file. Environment variables win over file
/// values, and command-line flags are expected to win over both.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the PostgREST server, e.g. `http://localhost:3000`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Sent as `apikey` and, until replaced, as the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default schema profile for every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Transport timeout as a duration string (`30s`, `1m30s`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Extra headers sent with every request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// `$PGREST_CONFIG`, or `$XDG_CONFIG_HOME/pgrest/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => xdg_config_home().join("pgrest").join("config.toml"),
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

impl Config {
    /// Loads the configuration from [`config_path`] and applies environment
    /// overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Like [`Config::load`] but reads `path`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("loaded config from {}", path.display());
                toml::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.apply_env();
        Ok(config)
    }

    /// Overrides file values with `PGREST_URL`, `PGREST_API_KEY` and
    /// `PGREST_SCHEMA` when they are set and non-empty.
    pub fn apply_env(&mut self) {
        let overrides = [
            (URL_ENV, &mut self.url),
            (API_KEY_ENV, &mut self.api_key),
            (SCHEMA_ENV, &mut self.schema),
        ];

        for (key, field) in overrides {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    *field = Some(value);
                }
            }
        }
    }

    /// The parsed server URL.
    pub fn url(&self) -> Result<Url> {
        let raw = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingUrl)?;

        let url = Url::parse(raw).map_err(|err| {
            ConfigError::InvalidUrl {
                url: raw.to_string(),
                reason: err.to_string(),
            }
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => {
                Err(ConfigError::InvalidUrl {
                    url: raw.to_string(),
                    reason: format!("unsupported scheme `{scheme}`"),
                })
            }
        }
    }

    pub fn timeout_duration(&self) -> Result<Option<Duration>> {
        match &self.timeout {
            Some(raw) => {
                parse_duration(raw)
                    .map(Some)
                    .ok_or_else(|| ConfigError::InvalidDuration(raw.clone()))
            }
            None => Ok(None),
        }
    }

    /// Checks the URL, the timeout and every header entry.
    pub fn validate(&self) -> Result<()> {
        self.url()?;
        self.timeout_duration()?;

        for (name, value) in &self.headers {
            if name.is_empty() || !name.chars().all(is_token_char) {
                return Err(ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: "name must be a non-empty HTTP token".to_string(),
                });
            }
            if value.chars().any(|c| c.is_control() && c != '\t') {
                return Err(ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: "value must not contain control characters".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
