//! Turns command-line query flags into builder calls.

use pgrest::prelude::*;

use crate::{
    cli::QueryArgs,
    error::{CliError, CliResult},
};

/// Splits `column=operator.value`. The value may itself contain dots.
pub fn parse_filter(raw: &str) -> CliResult<(&str, &str, &str)> {
    let invalid = || CliError::InvalidFilter(raw.to_string());

    let (column, expr) = raw.split_once('=').ok_or_else(invalid)?;
    let (operator, value) = expr.split_once('.').ok_or_else(invalid)?;
    if column.is_empty() || operator.is_empty() {
        return Err(invalid());
    }
    Ok((column, operator, value))
}

/// Parses `column[.asc|.desc][.nullsfirst|.nullslast]`.
pub fn parse_order(raw: &str) -> CliResult<(&str, OrderOptions)> {
    let mut parts = raw.split('.');
    let column = parts
        .next()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| CliError::InvalidOrder(raw.to_string()))?;

    let mut options = OrderOptions::default();
    for part in parts {
        match part {
            "asc" => options.ascending = true,
            "desc" => options.ascending = false,
            "nullsfirst" => options.nulls_first = true,
            "nullslast" => options.nulls_first = false,
            _ => return Err(CliError::InvalidOrder(raw.to_string())),
        }
    }
    Ok((column, options))
}

/// Parses an inclusive `from-to` window.
pub fn parse_range(raw: &str) -> CliResult<(u64, u64)> {
    let invalid = || CliError::InvalidRange(raw.to_string());

    let (from, to) = raw.split_once('-').ok_or_else(invalid)?;
    let from: u64 = from.trim().parse().map_err(|_| invalid())?;
    let to: u64 = to.trim().parse().map_err(|_| invalid())?;
    if from > to {
        return Err(invalid());
    }
    Ok((from, to))
}

pub fn parse_count(raw: &str) -> CliResult<Count> {
    raw.parse()
        .map_err(|_| CliError::InvalidCount(raw.to_string()))
}

/// Applies filters, ordering, pagination and result mode in that order.
pub fn apply(mut builder: QueryBuilder, args: &QueryArgs) -> CliResult<QueryBuilder> {
    for raw in &args.filter {
        let (column, operator, value) = parse_filter(raw)?;
        builder = builder.filter(column, operator, value);
    }

    for raw in &args.order {
        let (column, options) = parse_order(raw)?;
        builder = builder.order_with(column, options);
    }

    if let Some(limit) = args.limit {
        builder = builder.limit(limit);
    }

    if let Some(range) = &args.range {
        let (from, to) = parse_range(range)?;
        builder = builder.range(from, to);
    }

    if args.single {
        builder = builder.single();
    } else if args.maybe_single {
        builder = builder.maybe_single();
    }

    Ok(builder)
}
