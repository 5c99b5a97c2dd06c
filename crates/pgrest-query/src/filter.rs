//! Filter encoding.
//!
//! Every filter call turns into exactly one [`FilterEntry`], a `key=value`
//! query parameter in PostgREST's `column=operator.value` shape. Encoding
//! happens when the filter is added so serialization problems surface
//! before any request is built.

use serde::Serialize;
use serde_json::Value;

use crate::error::{QueryError, Result};

/// One query-string parameter produced by a filter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub key: String,
    pub value: String,
}

impl FilterEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Comparison operators that take a literal value suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    Is,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::Is => "is",
        }
    }
}

/// Logical grouping of a raw sub-expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    Or,
    And,
}

impl Logic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::Or => "or",
            Logic::And => "and",
        }
    }
}

/// Full-text search flavours understood by PostgREST.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextSearchType {
    /// `to_tsquery`
    #[default]
    Raw,
    /// `plainto_tsquery`
    Plain,
    /// `phraseto_tsquery`
    Phrase,
    /// `websearch_to_tsquery`
    Websearch,
}

impl TextSearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSearchType::Raw => "fts",
            TextSearchType::Plain => "plfts",
            TextSearchType::Phrase => "phfts",
            TextSearchType::Websearch => "wfts",
        }
    }
}

/// Renders a value as the bare literal PostgREST expects after the operator.
///
/// Strings are written as-is (no JSON quoting), `null` as `null`, and every
/// other JSON value in its compact JSON form.
pub fn literal<V: Serialize + ?Sized>(operation: &'static str, value: &V) -> Result<String> {
    let value = serde_json::to_value(value).map_err(|e| QueryError::serialize(operation, e))?;
    Ok(match value {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn json<V: Serialize + ?Sized>(operation: &'static str, value: &V) -> Result<String> {
    serde_json::to_string(value).map_err(|e| QueryError::serialize(operation, e))
}

/// Quotes a list member when it contains characters that are reserved
/// inside a PostgREST `(...)` list.
fn list_member(value: String) -> String {
    if value.contains(&[',', '(', ')', '"', '\\'][..]) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value
    }
}

fn list<I, V>(operation: &'static str, values: I) -> Result<String>
where
    I: IntoIterator<Item = V>,
    V: Serialize,
{
    let members = values
        .into_iter()
        .map(|v| literal(operation, &v).map(list_member))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", members.join(",")))
}

/// `column=op.value` for the literal-suffix operators.
pub fn compare<V: Serialize + ?Sized>(op: Operator, column: &str, value: &V) -> Result<FilterEntry> {
    let value = literal(op.as_str(), value)?;
    Ok(FilterEntry::new(column, format!("{}.{}", op.as_str(), value)))
}

/// `column=in.(v1,v2)`. An empty list stays `in.()`.
pub fn in_list<I, V>(column: &str, values: I) -> Result<FilterEntry>
where
    I: IntoIterator<Item = V>,
    V: Serialize,
{
    Ok(FilterEntry::new(column, format!("in.{}", list("in", values)?)))
}

/// `column=not.in.(v1,v2)`.
pub fn not_in<I, V>(column: &str, values: I) -> Result<FilterEntry>
where
    I: IntoIterator<Item = V>,
    V: Serialize,
{
    Ok(FilterEntry::new(column, format!("not.in.{}", list("not_in", values)?)))
}

/// `column=cs.<json>`.
pub fn contains<V: Serialize + ?Sized>(column: &str, value: &V) -> Result<FilterEntry> {
    Ok(FilterEntry::new(column, format!("cs.{}", json("contains", value)?)))
}

/// `column=cd.<json>`.
pub fn contained_by<V: Serialize + ?Sized>(column: &str, value: &V) -> Result<FilterEntry> {
    Ok(FilterEntry::new(column, format!("cd.{}", json("contained_by", value)?)))
}

/// `column=ov.<json>`.
pub fn overlaps<V: Serialize + ?Sized>(column: &str, value: &V) -> Result<FilterEntry> {
    Ok(FilterEntry::new(column, format!("ov.{}", json("overlaps", value)?)))
}

/// `or=(<expr>)` / `and=(<expr>)`. The expression is passed through verbatim.
pub fn group(logic: Logic, expr: &str) -> FilterEntry {
    FilterEntry::new(logic.as_str(), format!("({expr})"))
}

/// `column=not.operator.value`.
pub fn not<V: Serialize + ?Sized>(column: &str, operator: &str, value: &V) -> Result<FilterEntry> {
    let value = literal("not", value)?;
    Ok(FilterEntry::new(column, format!("not.{operator}.{value}")))
}

/// `column=operator.value` with no further encoding.
pub fn raw(column: &str, operator: &str, value: &str) -> FilterEntry {
    FilterEntry::new(column, format!("{operator}.{value}"))
}

/// `column=<fts|plfts|phfts|wfts>[(config)].query`.
pub fn text_search(
    column: &str,
    query: &str,
    config: Option<&str>,
    kind: TextSearchType,
) -> FilterEntry {
    let config = config.map(|c| format!("({c})")).unwrap_or_default();
    FilterEntry::new(column, format!("{}{config}.{query}", kind.as_str()))
}

/// One `eq` entry per key of a JSON object, in the object's key order.
pub fn match_record<V: Serialize + ?Sized>(record: &V) -> Result<Vec<FilterEntry>> {
    let value = serde_json::to_value(record).map_err(|e| QueryError::serialize("match", e))?;
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(QueryError::InvalidArgument {
                operation: "match",
                reason: format!("expected a JSON object, got `{other}`"),
            });
        }
    };

    map.iter()
        .map(|(column, value)| compare(Operator::Eq, column, value))
        .collect()
}
