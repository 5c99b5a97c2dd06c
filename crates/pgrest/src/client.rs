use std::{
    fmt,
    future::Future,
    sync::{Arc, PoisonError, RwLock},
};

use pgrest_config::Config;
use pgrest_http::{AgentConfig, HeaderMap, Transport, UreqTransport};
use pgrest_query::{
    executor, state::header_pair, PostgrestResponse, QueryBuilder, QueryError, ResultMode,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

pub const API_KEY_HEADER: &str = "apikey";
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Default headers shared by a client and its clones.
///
/// A header that fails to parse is kept as `rejected` and surfaces as the
/// deferred error of every builder and RPC call made while it is set.
#[derive(Clone, Debug, Default)]
struct Defaults {
    headers: HeaderMap,
    rejected: Option<QueryError>,
}

impl Defaults {
    fn set(&mut self, name: &str, value: &str) {
        match header_pair(name, value) {
            Ok((header, value)) => {
                let replaces_rejected = matches!(
                    &self.rejected,
                    Some(QueryError::InvalidHeader { name: rejected, .. })
                        if rejected.eq_ignore_ascii_case(name)
                );
                if replaces_rejected {
                    self.rejected = None;
                }
                self.headers.insert(header, value);
            }
            Err(err) => {
                warn!("{err}");
                self.rejected.get_or_insert(err);
            }
        }
    }
}

/// Entry point for table queries and RPC calls.
///
/// A client binds an endpoint, a transport and a set of default headers.
/// Cloning is cheap and clones share the default headers, so a token set
/// through one handle is seen by builders created from any of them.
#[derive(Clone)]
pub struct Client {
    endpoint: String,
    transport: Arc<dyn Transport>,
    defaults: Arc<RwLock<Defaults>>,
    schema: Option<String>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// A client for `endpoint` using the default blocking HTTP agent.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_transport(endpoint, Arc::new(UreqTransport::default()))
    }

    /// A client that sends every request through `transport`.
    pub fn with_transport(endpoint: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            defaults: Arc::new(RwLock::new(Defaults::default())),
            schema: None,
        }
    }

    /// Builds a client from a validated configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let agent = AgentConfig {
            timeout: config.timeout_duration()?,
            ..AgentConfig::default()
        };
        let agent = match &config.user_agent {
            Some(user_agent) => {
                AgentConfig {
                    user_agent: Some(user_agent.clone()),
                    ..agent
                }
            }
            None => agent,
        };

        let endpoint = config.url()?.to_string();
        debug!("client for {endpoint}");

        let mut client = Self::with_transport(endpoint, Arc::new(UreqTransport::new(agent)));
        for (name, value) in &config.headers {
            client = client.header(name, value);
        }
        if let Some(key) = &config.api_key {
            client = client.api_key(key);
        }
        if let Some(schema) = &config.schema {
            client = client.schema(schema);
        }

        Ok(client)
    }

    /// Sends `apikey: <key>` with every request, and `Authorization:
    /// Bearer <key>` until [`Client::set_auth`] replaces it.
    pub fn api_key(self, key: &str) -> Self {
        {
            let mut defaults = self.defaults.write().unwrap_or_else(PoisonError::into_inner);
            defaults.set(API_KEY_HEADER, key);
            defaults.set(AUTHORIZATION_HEADER, &format!("Bearer {key}"));
        }
        self
    }

    /// Adds a default header sent with every request.
    ///
    /// An invalid name or value is not applied; builders created while it
    /// is set fail with [`QueryError::InvalidHeader`] when executed.
    pub fn header(self, name: &str, value: &str) -> Self {
        self.defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(name, value);
        self
    }

    /// Sets the bearer token for builders created after this call.
    ///
    /// Builders that already exist keep the headers they were created with.
    pub fn set_auth(&self, token: &str) {
        self.defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(AUTHORIZATION_HEADER, &format!("Bearer {token}"));
    }

    /// A handle whose builders and RPC calls target `schema`.
    pub fn schema(&self, schema: &str) -> Self {
        Self {
            schema: Some(schema.to_string()),
            ..self.clone()
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn defaults(&self) -> Defaults {
        self.defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A copy of the current default headers.
    pub fn headers(&self) -> HeaderMap {
        self.defaults().headers
    }

    /// A fresh builder for `table`, seeded with the current headers.
    pub fn from(&self, table: &str) -> QueryBuilder {
        let Defaults { headers, rejected } = self.defaults();
        let builder = QueryBuilder::new(
            self.endpoint.as_str(),
            Arc::clone(&self.transport),
            table,
            headers,
        );
        let builder = match rejected {
            Some(err) => builder.with_error(err),
            None => builder,
        };
        match &self.schema {
            Some(schema) => builder.schema(schema),
            None => builder,
        }
    }

    /// Calls a stored function with `POST <endpoint>/rpc/<function>`.
    ///
    /// The request is built when this is called, so a later `set_auth` does
    /// not affect it. Pass `()` or `None::<()>` to send no body. Like table
    /// queries, backend and transport failures resolve into the envelope.
    pub fn rpc<P: Serialize>(
        &self,
        function: &str,
        params: P,
    ) -> impl Future<Output = std::result::Result<PostgrestResponse, QueryError>> + Send + 'static
    {
        let Defaults { headers, rejected } = self.defaults();
        let prepared = match rejected {
            Some(err) => Err(err),
            None => {
                serde_json::to_value(params)
                    .map_err(|err| {
                        QueryError::Serialize {
                            operation: "rpc",
                            reason: err.to_string(),
                        }
                    })
                    .and_then(|params| {
                        executor::build_rpc_request(
                            &self.endpoint,
                            function,
                            &params,
                            &headers,
                            self.schema.as_deref(),
                        )
                    })
            }
        };
        let transport = Arc::clone(&self.transport);

        async move {
            let request = prepared?;
            Ok(executor::execute(transport, request, ResultMode::Collection).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use pgrest_http::{HttpResponse, Method, RecordingTransport};
    use serde_json::json;

    use super::*;

    const ENDPOINT: &str = "http://localhost:3000";

    fn client() -> (Client, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        (Client::with_transport(ENDPOINT, transport.clone()), transport)
    }

    #[test]
    fn test_api_key_headers() {
        let (client, _) = client();
        let client = client.api_key("anon");

        let request = client.from("users").build_request().unwrap();
        assert_eq!(request.headers["apikey"], "anon");
        assert_eq!(request.headers["Authorization"], "Bearer anon");
    }

    #[test]
    fn test_set_auth_snapshots_into_new_builders_only() {
        let (client, _) = client();
        let before = client.from("users");

        client.set_auth("token-1");
        let after = client.from("users");

        assert!(!before
            .build_request()
            .unwrap()
            .headers
            .contains_key("Authorization"));
        assert_eq!(
            after.build_request().unwrap().headers["Authorization"],
            "Bearer token-1"
        );

        client.set_auth("token-2");
        assert_eq!(
            after.build_request().unwrap().headers["Authorization"],
            "Bearer token-1"
        );
    }

    #[test]
    fn test_set_auth_through_shared_reference() {
        let (client, _) = client();
        let shared = &client;
        shared.set_auth("t");
        assert_eq!(client.headers()["Authorization"], "Bearer t");
    }

    #[test]
    fn test_from_yields_independent_builders() {
        let (client, _) = client();
        let a = client.from("users").eq("id", 1);
        let b = client.from("users");

        assert_eq!(a.state().filters.len(), 1);
        assert!(b.state().filters.is_empty());
        assert_eq!(b.state().columns, "*");
    }

    #[test]
    fn test_schema_handle() {
        let (client, _) = client();
        let api = client.schema("api");

        let get = api.from("users").build_request().unwrap();
        assert_eq!(get.headers["Accept-Profile"], "api");

        let insert = api.from("users").insert(json!({"a": 1})).build_request().unwrap();
        assert_eq!(insert.headers["Content-Profile"], "api");

        let plain = client.from("users").build_request().unwrap();
        assert!(!plain.headers.contains_key("Accept-Profile"));
    }

    #[test]
    fn test_custom_header() {
        let (client, _) = client();
        let client = client.header("X-Client-Info", "pgrest-test");
        let request = client.from("users").build_request().unwrap();
        assert_eq!(request.headers["x-client-info"], "pgrest-test");
    }

    #[tokio::test]
    async fn test_invalid_default_header_is_deferred() {
        let (client, transport) = client();
        let client = client.header("X-Bad Name", "x");

        let err = client.from("users").await.unwrap_err();
        assert!(matches!(
            err,
            QueryError::InvalidHeader { ref name, .. } if name == "X-Bad Name"
        ));
        assert!(matches!(
            client.rpc("ping", ()).await,
            Err(QueryError::InvalidHeader { .. })
        ));
        assert!(transport.is_empty());
    }

    #[test]
    fn test_valid_token_clears_rejected_token() {
        let (client, _) = client();
        client.set_auth("bad\ntoken");
        assert!(client.from("users").build_request().is_err());

        client.set_auth("good");
        let request = client.from("users").build_request().unwrap();
        assert_eq!(request.headers["Authorization"], "Bearer good");
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            url: Some("http://localhost:3000".to_string()),
            api_key: Some("anon".to_string()),
            schema: Some("api".to_string()),
            timeout: Some("10s".to_string()),
            ..Config::default()
        };

        let client = Client::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000/");
        assert_eq!(client.headers()["apikey"], "anon");

        let request = client.from("users").build_request().unwrap();
        assert_eq!(request.url, "http://localhost:3000/users");
        assert_eq!(request.headers["Accept-Profile"], "api");
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = Config {
            url: Some("http://localhost:3000".to_string()),
            timeout: Some("later".to_string()),
            ..Config::default()
        };
        assert!(Client::from_config(&config).is_err());
        assert!(Client::from_config(&Config::default()).is_err());
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let (client, transport) = client();
        transport.respond(
            HttpResponse::new(200, r#"[{"id":1},{"id":2}]"#).with_header("Content-Range", "0-1/2"),
        );

        let response = client
            .from("users")
            .select("id")
            .in_("id", [1, 2])
            .await
            .unwrap();

        assert_eq!(response.data, Some(json!([{"id": 1}, {"id": 2}])));
        assert_eq!(response.count, Some(2));
        assert_eq!(
            transport.last_request().unwrap().url,
            "http://localhost:3000/users?select=id&id=in.(1,2)"
        );
    }

    #[tokio::test]
    async fn test_rpc_posts_params() {
        let (client, transport) = client();
        transport.respond(HttpResponse::new(200, "42"));

        let response = client
            .rpc("add", json!({"a": 40, "b": 2}))
            .await
            .unwrap();

        assert_eq!(response.data, Some(json!(42)));
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "http://localhost:3000/rpc/add");
        assert_eq!(request.body.as_deref(), Some(br#"{"a":40,"b":2}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_rpc_without_params_sends_no_body() {
        let (client, transport) = client();
        client.rpc("ping", ()).await.unwrap();
        assert_eq!(transport.last_request().unwrap().body, None);
    }

    #[tokio::test]
    async fn test_rpc_backend_error() {
        let (client, transport) = client();
        transport.respond(HttpResponse::new(
            404,
            r#"{"message":"function not found","code":"PGRST202"}"#,
        ));

        let response = client.rpc("missing", ()).await.unwrap();
        assert_eq!(response.data, None);
        let error = response.error.unwrap();
        assert_eq!(error.message, "function not found");
        assert_eq!(error.code.as_deref(), Some("PGRST202"));
    }

    #[tokio::test]
    async fn test_transport_failure_resolves_to_envelope() {
        let (client, transport) = client();
        transport.fail("connection refused");

        let response = client.from("users").await.unwrap();
        assert_eq!(response.data, None);
        assert!(response.error.unwrap().message.contains("connection refused"));
        assert_eq!(response.status, None);
    }
}
