//! Turns query state into one HTTP request and the response into an envelope.

use std::sync::{Arc, LazyLock};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use pgrest_http::{
    HeaderMap, HeaderValue, HttpRequest, HttpResponse, Method, Transport, TransportError,
};
use regex::Regex;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::{
    coerce::coerce,
    error::{QueryError, Result},
    response::{PostgrestError, PostgrestResponse, DECODE_ERROR_CODE},
    state::{
        header_pair, merge_prefer, QueryState, ResultMode, ACCEPT_PROFILE, CONTENT_PROFILE,
        CONTENT_RANGE, CONTENT_TYPE, JSON_MEDIA_TYPE, PREFER,
    },
};

/// Characters left readable in query components. PostgREST's own syntax
/// (`.`, `,`, `(`, `)`, `*`, `:`) stays as-is; everything else is escaped.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'*')
    .remove(b',')
    .remove(b'(')
    .remove(b')')
    .remove(b':');

static CONTENT_RANGE_TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)$").expect("unable to compile content-range regex"));

/// Encodes `key=value` pairs into a query string, preserving order.
pub fn encode_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_COMPONENT),
                utf8_percent_encode(value, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn join_url(endpoint: &str, path: &str, query: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if query.is_empty() {
        format!("{endpoint}/{path}")
    } else {
        format!("{endpoint}/{path}?{query}")
    }
}

fn json_body(operation: &'static str, value: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| QueryError::serialize(operation, e))
}

/// Builds the single request a table query resolves to.
pub fn build_request(endpoint: &str, state: &QueryState) -> Result<HttpRequest> {
    let method = state.method();
    let url = join_url(endpoint, &state.table, &encode_query(&state.query_pairs()));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
    headers.extend(state.headers.clone());

    if let Some(prefer) = state.prefer() {
        let caller: Vec<&str> = headers
            .get_all(PREFER)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        let (name, value) = header_pair(PREFER, &merge_prefer(&prefer, &caller))?;
        headers.insert(name, value);
    }

    if let Some(schema) = &state.schema {
        let profile = if method == Method::Get {
            ACCEPT_PROFILE
        } else {
            CONTENT_PROFILE
        };
        let (name, value) = header_pair(profile, schema)?;
        headers.insert(name, value);
    }

    let body = state
        .mutation
        .as_ref()
        .and_then(|m| m.payload())
        .map(|payload| json_body("body", payload))
        .transpose()?;

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}

/// Builds `POST <endpoint>/rpc/<function>`. A `null` argument sends no body.
pub fn build_rpc_request(
    endpoint: &str,
    function: &str,
    params: &Value,
    headers: &HeaderMap,
    schema: Option<&str>,
) -> Result<HttpRequest> {
    let mut request_headers = HeaderMap::new();
    request_headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
    request_headers.extend(headers.clone());
    if let Some(schema) = schema {
        let (name, value) = header_pair(CONTENT_PROFILE, schema)?;
        request_headers.insert(name, value);
    }

    let body = match params {
        Value::Null => None,
        params => Some(json_body("rpc", params)?),
    };

    Ok(HttpRequest {
        method: Method::Post,
        url: join_url(endpoint, &format!("rpc/{function}"), ""),
        headers: request_headers,
        body,
    })
}

/// Total row count from a `Content-Range` header such as `0-9/120`.
///
/// A missing header, or an unknown total (`0-9/*`), yields `None`.
pub fn parse_count(content_range: Option<&str>) -> Option<u64> {
    let header = content_range?.trim();
    let total = CONTENT_RANGE_TOTAL
        .captures(header)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());

    if total.is_none() {
        debug!("no total in Content-Range `{header}`");
    }
    total
}

fn text_field(body: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Error for a non-2xx response: the body's `message`/`code`/`details`/`hint`
/// when it is a JSON object, the status text otherwise.
fn backend_error(response: &HttpResponse) -> PostgrestError {
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(Value::Object(body)) => PostgrestError {
            message: text_field(&body, "message").unwrap_or_else(|| response.status_text.clone()),
            code: text_field(&body, "code"),
            details: text_field(&body, "details"),
            hint: text_field(&body, "hint"),
        },
        _ => {
            warn!(
                "HTTP {} with a non-JSON error body, falling back to status text",
                response.status
            );
            PostgrestError::new(response.status_text.clone())
        }
    }
}

/// Decodes a response into the envelope.
pub fn decode(response: HttpResponse, mode: ResultMode) -> PostgrestResponse {
    let count = parse_count(
        response
            .headers
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok()),
    );
    let status = response.status;

    if !response.is_success() {
        let error = if mode == ResultMode::HeadOnly {
            PostgrestError::new(response.status_text.clone())
        } else {
            backend_error(&response)
        };
        return PostgrestResponse::err(error, count, Some(status));
    }

    if mode == ResultMode::HeadOnly || response.body.iter().all(u8::is_ascii_whitespace) {
        return PostgrestResponse::ok(None, count, status);
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(body) => PostgrestResponse::ok(coerce(mode, Some(body)), count, status),
        Err(err) => PostgrestResponse::err(
            PostgrestError::new(format!("Failed to decode response body: {err}"))
                .with_code(DECODE_ERROR_CODE),
            count,
            Some(status),
        ),
    }
}

/// Sends `request` once and decodes the result.
///
/// The blocking transport runs on the current tokio runtime's blocking pool.
/// Transport failures, including a missing runtime, become
/// `{data: null, error: {message}}`; nothing here returns `Err`.
pub async fn execute(
    transport: Arc<dyn Transport>,
    request: HttpRequest,
    mode: ResultMode,
) -> PostgrestResponse {
    debug!("{} {}", request.method, request.url);

    let result = match Handle::try_current() {
        Ok(runtime) => {
            runtime
                .spawn_blocking(move || transport.send(request))
                .await
                .map_err(|e| TransportError::Task(e.to_string()))
                .and_then(|sent| sent)
        }
        Err(err) => Err(TransportError::Task(err.to_string())),
    };

    match result {
        Ok(response) => {
            debug!("HTTP {} {}", response.status, response.status_text);
            decode(response, mode)
        }
        Err(err) => {
            warn!("request failed: {err}");
            PostgrestResponse::err(PostgrestError::new(err.to_string()), None, None)
        }
    }
}
