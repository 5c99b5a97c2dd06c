//! Accumulated query state.
//!
//! Owned by exactly one [`crate::QueryBuilder`]. Chain calls only append to or
//! overwrite fields here; nothing in this module performs I/O.

pub use pgrest_http::header::{ACCEPT, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use pgrest_http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;

use crate::{error::QueryError, filter::FilterEntry};

pub const ACCEPT_PROFILE: &str = "accept-profile";
pub const CONTENT_PROFILE: &str = "content-profile";
pub const PREFER: &str = "prefer";

pub const JSON_MEDIA_TYPE: &str = "application/json";
pub const SINGLE_OBJECT_MEDIA_TYPE: &str = "application/vnd.pgrst.object+json";

/// Parses a caller-supplied header.
pub fn header_pair(
    name: &str,
    value: &str,
) -> crate::error::Result<(HeaderName, HeaderValue)> {
    let invalid = |reason: String| {
        QueryError::InvalidHeader {
            name: name.to_string(),
            reason,
        }
    };
    let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header, value))
}

/// Merges the computed `Prefer` tokens with any the caller set.
///
/// Computed tokens come first. A caller token whose key is already computed
/// is dropped, so `return=` and `count=` always match the result mode.
pub fn merge_prefer(computed: &str, caller: &[&str]) -> String {
    fn key(token: &str) -> &str {
        token.split('=').next().unwrap_or(token).trim()
    }

    let computed_keys: Vec<&str> = computed.split(',').map(key).collect();
    let mut tokens = vec![computed.to_string()];
    for token in caller.iter().flat_map(|value| value.split(',')) {
        let token = token.trim();
        if !token.is_empty() && !computed_keys.contains(&key(token)) {
            tokens.push(token.to_string());
        }
    }
    tokens.join(",")
}

/// How the decoded body is shaped into the envelope's `data`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultMode {
    #[default]
    Collection,
    Single,
    MaybeSingle,
    HeadOnly,
}

impl ResultMode {
    pub fn is_singular(&self) -> bool {
        matches!(self, ResultMode::Single | ResultMode::MaybeSingle)
    }
}

/// Row counting strategy requested through `Prefer: count=<mode>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Exact,
    Planned,
    Estimated,
}

impl Count {
    pub fn as_str(&self) -> &'static str {
        match self {
            Count::Exact => "exact",
            Count::Planned => "planned",
            Count::Estimated => "estimated",
        }
    }
}

impl std::str::FromStr for Count {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Count::Exact),
            "planned" => Ok(Count::Planned),
            "estimated" => Ok(Count::Estimated),
            other => Err(format!("unknown count mode `{other}`")),
        }
    }
}

/// The single active mutation. Setting another one replaces it.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Insert(Value),
    Update(Value),
    Upsert {
        payload: Value,
        on_conflict: Option<String>,
    },
    Delete,
}

impl Mutation {
    pub fn method(&self) -> Method {
        match self {
            Mutation::Insert(_) | Mutation::Upsert { .. } => Method::Post,
            Mutation::Update(_) => Method::Patch,
            Mutation::Delete => Method::Delete,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Mutation::Insert(payload) | Mutation::Update(payload) => Some(payload),
            Mutation::Upsert { payload, .. } => Some(payload),
            Mutation::Delete => None,
        }
    }
}

/// One sort key of an `order` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub foreign_table: Option<String>,
    pub column: String,
    pub ascending: bool,
    pub nulls_first: bool,
}

impl OrderTerm {
    pub fn encode(&self) -> String {
        format!(
            "{}.{}.{}",
            self.column,
            if self.ascending { "asc" } else { "desc" },
            if self.nulls_first {
                "nullsfirst"
            } else {
                "nullslast"
            }
        )
    }

    fn key(&self) -> String {
        match &self.foreign_table {
            Some(table) => format!("{table}.order"),
            None => "order".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectOptions {
    pub count: Option<Count>,
    pub head: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOptions {
    pub ascending: bool,
    pub nulls_first: bool,
    pub foreign_table: Option<String>,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            ascending: true,
            nulls_first: false,
            foreign_table: None,
        }
    }
}

impl OrderOptions {
    pub fn descending() -> Self {
        Self {
            ascending: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    pub on_conflict: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub table: String,
    pub columns: String,
    pub filters: Vec<FilterEntry>,
    pub orders: Vec<OrderTerm>,
    pub limit: Option<u64>,
    pub foreign_limits: Vec<(String, u64)>,
    pub mutation: Option<Mutation>,
    pub count: Option<Count>,
    pub schema: Option<String>,
    pub headers: HeaderMap,
    pub mode: ResultMode,
}

impl QueryState {
    pub fn new(table: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: vec![],
            orders: vec![],
            limit: None,
            foreign_limits: vec![],
            mutation: None,
            count: None,
            schema: None,
            headers,
            mode: ResultMode::Collection,
        }
    }

    pub fn method(&self) -> Method {
        self.mutation
            .as_ref()
            .map(Mutation::method)
            .unwrap_or(Method::Get)
    }

    /// Query parameters in wire order: `select`, filters in call order,
    /// `order` groups, then limits.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![];

        if self.method() == Method::Get && self.columns != "*" {
            pairs.push(("select".to_string(), self.columns.clone()));
        }

        pairs.extend(
            self.filters
                .iter()
                .map(|f| (f.key.clone(), f.value.clone())),
        );

        let mut orders: Vec<(String, Vec<String>)> = vec![];
        for term in &self.orders {
            let key = term.key();
            match orders.iter_mut().find(|(k, _)| *k == key) {
                Some((_, terms)) => terms.push(term.encode()),
                None => orders.push((key, vec![term.encode()])),
            }
        }
        pairs.extend(
            orders
                .into_iter()
                .map(|(key, terms)| (key, terms.join(","))),
        );

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs.extend(
            self.foreign_limits
                .iter()
                .map(|(table, limit)| (format!("{table}.limit"), limit.to_string())),
        );

        pairs
    }

    /// The `Prefer` header value implied by the mutation and count settings.
    pub fn prefer(&self) -> Option<String> {
        let mut parts = vec![];

        if let Some(mutation) = &self.mutation {
            parts.push("return=representation".to_string());
            if let Mutation::Upsert { on_conflict, .. } = mutation {
                parts.push("resolution=merge-duplicates".to_string());
                if let Some(column) = on_conflict {
                    parts.push(format!("on_conflict={column}"));
                }
            }
        }

        if let Some(count) = self.count {
            parts.push(format!("count={}", count.as_str()));
        }

        (!parts.is_empty()).then(|| parts.join(","))
    }
}
