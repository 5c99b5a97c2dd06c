//! Result shaping for single-row, head-only and collection queries.

use serde_json::Value;

use crate::state::ResultMode;

/// Shapes a decoded body according to `mode`.
///
/// `single` and `maybe_single` behave identically here: an array collapses
/// to its first element, or `None` when empty. Neither reports a zero-row
/// result as an error.
pub fn coerce(mode: ResultMode, body: Option<Value>) -> Option<Value> {
    match mode {
        ResultMode::HeadOnly => None,
        ResultMode::Collection => body.filter(|v| !v.is_null()),
        ResultMode::Single | ResultMode::MaybeSingle => match body {
            Some(Value::Array(rows)) => rows.into_iter().next().filter(|v| !v.is_null()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other),
        },
    }
}
