use std::{io::Read, time::Duration};

use tracing::trace;
use ureq::{http::HeaderMap, Agent, Body, Proxy, RequestBuilder};

use crate::{
    error::TransportError,
    transport::{status_text, HttpRequest, HttpResponse, Method, Transport},
};

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub user_agent: Option<String>,
    pub headers: Option<HeaderMap>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
}

impl Default for AgentConfig {
    /// Creates an `AgentConfig` with a `pgrest/<version>` user agent and no
    /// proxy, extra headers or timeout.
    ///
    /// # Examples
    ///
    /// ```
    /// use pgrest_http::AgentConfig;
    ///
    /// let cfg = AgentConfig::default();
    /// assert!(cfg.user_agent.as_deref().unwrap().starts_with("pgrest/"));
    /// assert!(cfg.proxy.is_none());
    /// assert!(cfg.timeout.is_none());
    /// ```
    fn default() -> Self {
        Self {
            user_agent: Some(concat!("pgrest/", env!("CARGO_PKG_VERSION")).into()),
            proxy: None,
            headers: None,
            timeout: None,
        }
    }
}

impl AgentConfig {
    /// Builds a `ureq` agent from this configuration.
    ///
    /// Error statuses are left to the caller: a 4xx or 5xx reply comes back
    /// as a normal response so its body can be decoded.
    pub fn build(&self) -> Agent {
        let mut config = ureq::Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout)
            .http_status_as_error(false);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
    config: AgentConfig,
}

impl UreqTransport {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            agent: config.build(),
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(AgentConfig::default())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let response = match method {
            Method::Get => {
                let req = apply_headers(self.agent.get(url.as_str()), &self.config.headers, &headers);
                req.call()?
            }
            Method::Delete => {
                let req =
                    apply_headers(self.agent.delete(url.as_str()), &self.config.headers, &headers);
                req.call()?
            }
            Method::Post => {
                let req = apply_headers(self.agent.post(url.as_str()), &self.config.headers, &headers);
                match body {
                    Some(body) => req.send(body)?,
                    None => req.send_empty()?,
                }
            }
            Method::Patch => {
                let req =
                    apply_headers(self.agent.patch(url.as_str()), &self.config.headers, &headers);
                match body {
                    Some(body) => req.send(body)?,
                    None => req.send_empty()?,
                }
            }
        };

        read_response(response)
    }
}

/// Applies the agent-wide headers first, then the per-request ones, so a
/// request can override anything configured globally.
fn apply_headers<B>(
    mut req: RequestBuilder<B>,
    global: &Option<HeaderMap>,
    headers: &HeaderMap,
) -> RequestBuilder<B> {
    if let Some(global) = global {
        for (key, value) in global.iter() {
            if !headers.contains_key(key) {
                req = req.header(key, value);
            }
        }
    }
    for (key, value) in headers.iter() {
        trace!("{key}: {value:?}");
        req = req.header(key, value);
    }
    req
}

fn read_response(
    response: ureq::http::Response<Body>,
) -> Result<HttpResponse, TransportError> {
    let status = response.status();
    let headers = response.headers().clone();

    let mut body = Vec::new();
    response.into_body().into_reader().read_to_end(&mut body)?;

    Ok(HttpResponse {
        status: status.as_u16(),
        status_text: status_text(status.as_u16()),
        headers,
        body,
    })
}
