use std::{
    fmt::Display,
    io::Read,
    sync::{LazyLock, PoisonError, RwLock},
};

use nu_ansi_term::Color;
use serde_json::Value;

use crate::error::{CliError, CliResult};

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().unwrap_or_else(PoisonError::into_inner);
        if *color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Parses a JSON argument. `-` reads the document from stdin.
pub fn read_json(input: &str) -> CliResult<Value> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        return Ok(serde_json::from_str(&buffer)?);
    }
    Ok(serde_json::from_str(input)?)
}

/// Splits `Name: value` into its parts.
pub fn parse_header(header: &str) -> CliResult<(String, String)> {
    let (name, value) = header
        .split_once(':')
        .ok_or_else(|| CliError::InvalidHeader(header.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidHeader(header.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
