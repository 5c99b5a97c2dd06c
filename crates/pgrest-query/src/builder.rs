//! The fluent query builder.

use std::{
    fmt,
    future::{Future, IntoFuture},
    sync::Arc,
};

use pgrest_http::{HeaderMap, HeaderValue, HttpRequest, Transport};
use serde::Serialize;
use serde_json::Value;

use crate::{
    error::{QueryError, Result},
    executor,
    filter::{self, FilterEntry, Logic, Operator, TextSearchType},
    response::PostgrestResponse,
    state::{
        header_pair, Mutation, OrderOptions, OrderTerm, QueryState, ResultMode, SelectOptions,
        UpsertOptions, ACCEPT, SINGLE_OBJECT_MEDIA_TYPE,
    },
    BoxFuture,
};

/// A deferred PostgREST query.
///
/// Created by the client's `from(table)`, then chained. Chain calls only
/// record state; nothing is sent until [`QueryBuilder::execute`] is called
/// or the builder is awaited.
///
/// Each call to `execute` (or each await of `&builder`) issues a new,
/// independent request. Results are not memoized and mutations are not
/// deduplicated, so awaiting an insert twice inserts twice.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use pgrest_http::UreqTransport;
/// use pgrest_query::{OrderOptions, QueryBuilder};
///
/// # async fn run() -> pgrest_query::error::Result<()> {
/// let response = QueryBuilder::new(
///     "http://localhost:3000",
///     Arc::new(UreqTransport::default()),
///     "users",
///     Default::default(),
/// )
/// .select("id,name")
/// .gte("age", 18)
/// .order_with("name", OrderOptions::descending())
/// .limit(10)
/// .await?;
///
/// println!("{:?}", response.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct QueryBuilder {
    endpoint: String,
    transport: Arc<dyn Transport>,
    state: QueryState,
    error: Option<QueryError>,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

/// Removes whitespace outside of double-quoted identifiers.
fn clean_columns(columns: &str) -> String {
    let mut quoted = false;
    columns
        .chars()
        .filter(|c| {
            if *c == '"' {
                quoted = !quoted;
            }
            quoted || !c.is_whitespace()
        })
        .collect()
}

impl QueryBuilder {
    pub fn new(
        endpoint: impl Into<String>,
        transport: Arc<dyn Transport>,
        table: impl Into<String>,
        headers: HeaderMap,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            state: QueryState::new(table, headers),
            error: None,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// The first misuse recorded by a chain call, if any.
    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    fn fail(&mut self, err: QueryError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Records `err` as if a chain call had failed with it.
    pub fn with_error(mut self, err: QueryError) -> Self {
        self.fail(err);
        self
    }

    fn push(mut self, entry: Result<FilterEntry>) -> Self {
        match entry {
            Ok(entry) => self.state.filters.push(entry),
            Err(err) => self.fail(err),
        }
        self
    }

    fn mutate<T: Serialize>(
        mut self,
        operation: &'static str,
        data: T,
        make: impl FnOnce(Value) -> Mutation,
    ) -> Self {
        match serde_json::to_value(data) {
            Ok(payload) => self.state.mutation = Some(make(payload)),
            Err(err) => self.fail(QueryError::serialize(operation, err)),
        }
        self
    }

    /// Sets the projection. `"*"` selects every column.
    pub fn select(self, columns: &str) -> Self {
        self.select_with(columns, SelectOptions::default())
    }

    /// Sets the projection with a count mode and/or head-only mode.
    pub fn select_with(mut self, columns: &str, options: SelectOptions) -> Self {
        self.state.columns = clean_columns(columns);
        if let Some(count) = options.count {
            self.state.count = Some(count);
        }
        if options.head {
            self.state.mode = ResultMode::HeadOnly;
        }
        self
    }

    pub fn insert<T: Serialize>(self, data: T) -> Self {
        self.mutate("insert", data, Mutation::Insert)
    }

    pub fn update<T: Serialize>(self, data: T) -> Self {
        self.mutate("update", data, Mutation::Update)
    }

    pub fn upsert<T: Serialize>(self, data: T) -> Self {
        self.upsert_with(data, UpsertOptions::default())
    }

    pub fn upsert_with<T: Serialize>(self, data: T, options: UpsertOptions) -> Self {
        self.mutate("upsert", data, |payload| {
            Mutation::Upsert {
                payload,
                on_conflict: options.on_conflict,
            }
        })
    }

    pub fn delete(mut self) -> Self {
        self.state.mutation = Some(Mutation::Delete);
        self
    }

    pub fn eq<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::compare(Operator::Eq, column, &value))
    }

    pub fn neq<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::compare(Operator::Neq, column, &value))
    }

    pub fn gt<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::compare(Operator::Gt, column, &value))
    }

    pub fn gte<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::compare(Operator::Gte, column, &value))
    }

    pub fn lt<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::compare(Operator::Lt, column, &value))
    }

    pub fn lte<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::compare(Operator::Lte, column, &value))
    }

    pub fn like(self, column: &str, pattern: &str) -> Self {
        self.push(filter::compare(Operator::Like, column, pattern))
    }

    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.push(filter::compare(Operator::ILike, column, pattern))
    }

    /// `column=is.value`, for `null`, `true`, `false`.
    pub fn is<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::compare(Operator::Is, column, &value))
    }

    /// `column=in.(v1,v2)`. An empty iterator is sent as `in.()`.
    pub fn in_<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Serialize,
    {
        self.push(filter::in_list(column, values))
    }

    pub fn not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Serialize,
    {
        self.push(filter::not_in(column, values))
    }

    pub fn contains<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::contains(column, &value))
    }

    pub fn contained_by<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::contained_by(column, &value))
    }

    pub fn overlaps<V: Serialize>(self, column: &str, value: V) -> Self {
        self.push(filter::overlaps(column, &value))
    }

    pub fn text_search(
        self,
        column: &str,
        query: &str,
        config: Option<&str>,
        kind: TextSearchType,
    ) -> Self {
        self.push(Ok(filter::text_search(column, query, config, kind)))
    }

    /// `or=(<expr>)`, e.g. `.or("age.lt.18,age.gt.65")`.
    pub fn or(self, expr: &str) -> Self {
        self.push(Ok(filter::group(Logic::Or, expr)))
    }

    /// `and=(<expr>)`.
    pub fn and(self, expr: &str) -> Self {
        self.push(Ok(filter::group(Logic::And, expr)))
    }

    pub fn not<V: Serialize>(self, column: &str, operator: &str, value: V) -> Self {
        self.push(filter::not(column, operator, &value))
    }

    /// Raw `column=operator.value`; the value is not encoded further.
    pub fn filter(self, column: &str, operator: &str, value: &str) -> Self {
        self.push(Ok(filter::raw(column, operator, value)))
    }

    /// One `eq` filter per key of `record`, in key order.
    pub fn match_<V: Serialize>(mut self, record: V) -> Self {
        match filter::match_record(&record) {
            Ok(entries) => self.state.filters.extend(entries),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Ascending, nulls last.
    pub fn order(self, column: &str) -> Self {
        self.order_with(column, OrderOptions::default())
    }

    /// Appends a sort key. Successive calls build a compound ordering.
    pub fn order_with(mut self, column: &str, options: OrderOptions) -> Self {
        self.state.orders.push(OrderTerm {
            foreign_table: options.foreign_table,
            column: column.to_string(),
            ascending: options.ascending,
            nulls_first: options.nulls_first,
        });
        self
    }

    /// `<table>.order=` for an embedded resource.
    pub fn order_foreign(self, table: &str, column: &str, options: OrderOptions) -> Self {
        self.order_with(
            column,
            OrderOptions {
                foreign_table: Some(table.to_string()),
                ..options
            },
        )
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.state.limit = Some(count);
        self
    }

    /// `<table>.limit=<count>` for an embedded resource.
    pub fn limit_foreign(mut self, table: &str, count: u64) -> Self {
        match self.state.foreign_limits.iter_mut().find(|(t, _)| t == table) {
            Some(entry) => entry.1 = count,
            None => self.state.foreign_limits.push((table.to_string(), count)),
        }
        self
    }

    /// Inclusive, zero-indexed row window sent as `Range: from-to`.
    pub fn range(self, from: u64, to: u64) -> Self {
        self.header("range", &format!("{from}-{to}"))
    }

    /// Asks for one object. An array reply is reduced to its first row.
    pub fn single(mut self) -> Self {
        self.state.mode = ResultMode::Single;
        self.state
            .headers
            .insert(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT_MEDIA_TYPE));
        self
    }

    /// Same wire behavior as [`QueryBuilder::single`]; zero rows yield
    /// `data: None` without an error in both.
    pub fn maybe_single(mut self) -> Self {
        self.state.mode = ResultMode::MaybeSingle;
        self.state
            .headers
            .insert(ACCEPT, HeaderValue::from_static(SINGLE_OBJECT_MEDIA_TYPE));
        self
    }

    /// Targets a non-default schema through the profile headers.
    pub fn schema(mut self, schema: &str) -> Self {
        self.state.schema = Some(schema.to_string());
        self
    }

    /// Sets a request header, replacing any value it already has.
    ///
    /// A `Prefer` set here is merged with the one the query computes.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match header_pair(name, value) {
            Ok((name, value)) => {
                self.state.headers.insert(name, value);
            }
            Err(err) => self.fail(err),
        }
        self
    }

    /// The request this builder would send right now.
    pub fn build_request(&self) -> Result<HttpRequest> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        executor::build_request(&self.endpoint, &self.state)
    }

    /// Sends the query once and resolves to the envelope.
    ///
    /// The request is built from the state at call time. `Err` is returned
    /// only for misuse recorded while chaining, and in that case nothing is
    /// sent. Every backend or transport failure resolves to `Ok` with
    /// `error` set.
    ///
    /// The transport runs on tokio's blocking pool. Polled outside a tokio
    /// runtime, the future resolves to an envelope carrying a transport error.
    pub fn execute(
        &self,
    ) -> impl Future<Output = Result<PostgrestResponse>> + Send + 'static {
        let prepared = self.build_request();
        let transport = Arc::clone(&self.transport);
        let mode = self.state.mode;

        async move {
            let request = prepared?;
            Ok(executor::execute(transport, request, mode).await)
        }
    }
}

impl IntoFuture for QueryBuilder {
    type Output = Result<PostgrestResponse>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

impl IntoFuture for &QueryBuilder {
    type Output = Result<PostgrestResponse>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.execute())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pgrest_http::{HttpResponse, Method, RecordingTransport};
    use serde_json::json;

    use super::*;
    use crate::{response::PostgrestError, state::Count};

    const ENDPOINT: &str = "http://localhost:3000";

    fn builder(transport: &Arc<RecordingTransport>) -> QueryBuilder {
        QueryBuilder::new(ENDPOINT, transport.clone(), "users", HeaderMap::new())
    }

    fn query(builder: &QueryBuilder) -> String {
        let url = builder.build_request().unwrap().url;
        url.split_once('?')
            .map(|(_, query)| query.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_clean_columns() {
        assert_eq!(clean_columns(" id, name ,\n posts(title) "), "id,name,posts(title)");
        assert_eq!(clean_columns(r#"id, "full name""#), r#"id,"full name""#);
    }

    #[test]
    fn test_filters_keep_call_order_and_duplicates() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport)
            .gte("age", 18)
            .lt("age", 65)
            .eq("team", "red")
            .neq("status", "banned")
            .is("deleted_at", Value::Null);

        assert_eq!(b.state().filters.len(), 5);
        assert_eq!(
            query(&b),
            "age=gte.18&age=lt.65&team=eq.red&status=neq.banned&deleted_at=is.null"
        );
    }

    #[test]
    fn test_in_empty_is_sent() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).in_("id", Vec::<i32>::new());
        assert_eq!(query(&b), "id=in.()");
    }

    #[test]
    fn test_filter_family() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport)
            .like("name", "A%")
            .ilike("name", "%z")
            .in_("id", [1, 2])
            .not_in("id", [3])
            .contains("tags", ["a"])
            .contained_by("tags", ["a", "b"])
            .overlaps("tags", ["c"])
            .or("a.eq.1,b.eq.2")
            .and("c.gt.0,d.lt.9")
            .not("status", "eq", "done")
            .filter("meta", "cs", "{\"k\":1}")
            .text_search("body", "cats", Some("english"), TextSearchType::Plain);

        let filters: Vec<(String, String)> = b
            .state()
            .filters
            .iter()
            .map(|f| (f.key.clone(), f.value.clone()))
            .collect();
        let expected: Vec<(String, String)> = [
            ("name", "like.A%"),
            ("name", "ilike.%z"),
            ("id", "in.(1,2)"),
            ("id", "not.in.(3)"),
            ("tags", r#"cs.["a"]"#),
            ("tags", r#"cd.["a","b"]"#),
            ("tags", r#"ov.["c"]"#),
            ("or", "(a.eq.1,b.eq.2)"),
            ("and", "(c.gt.0,d.lt.9)"),
            ("status", "not.eq.done"),
            ("meta", r#"cs.{"k":1}"#),
            ("body", "plfts(english).cats"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(filters, expected);
    }

    #[test]
    fn test_match_expands_to_eq() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).match_(json!({"team": "red", "rank": 1}));
        assert_eq!(query(&b), "team=eq.red&rank=eq.1");
    }

    #[test]
    fn test_compound_order() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).order("a").order_with("b", OrderOptions::descending());
        assert_eq!(query(&b), "order=a.asc.nullslast,b.desc.nullslast");
    }

    #[test]
    fn test_order_nulls_first_and_foreign() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).order_with(
            "created_at",
            OrderOptions {
                ascending: false,
                nulls_first: true,
                foreign_table: Some("posts".into()),
            },
        );
        assert_eq!(query(&b), "posts.order=created_at.desc.nullsfirst");

        let b = builder(&transport)
            .order("id")
            .order_foreign("posts", "title", OrderOptions::default());
        assert_eq!(query(&b), "order=id.asc.nullslast&posts.order=title.asc.nullslast");
    }

    #[test]
    fn test_limit_and_range() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport)
            .limit(5)
            .limit(10)
            .limit_foreign("posts", 2)
            .range(0, 9);

        assert_eq!(query(&b), "limit=10&posts.limit=2");
        let request = b.build_request().unwrap();
        assert_eq!(request.headers["Range"], "0-9");
    }

    #[test]
    fn test_select_only_on_get() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).select("id, name");
        assert_eq!(query(&b), "select=id,name");

        let b = b.delete();
        assert_eq!(query(&b), "");
    }

    #[test]
    fn test_select_count_and_head() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).select_with(
            "*",
            SelectOptions {
                count: Some(Count::Exact),
                head: true,
            },
        );

        assert_eq!(b.state().mode, ResultMode::HeadOnly);
        let request = b.build_request().unwrap();
        assert_eq!(request.headers["Prefer"], "count=exact");
    }

    #[test]
    fn test_last_mutation_wins() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport)
            .insert(json!({"name": "ada"}))
            .update(json!({"name": "bob"}));

        assert_eq!(
            b.state().mutation,
            Some(Mutation::Update(json!({"name": "bob"})))
        );
        let request = b.build_request().unwrap();
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.headers["Prefer"], "return=representation");

        let b = b.delete();
        assert_eq!(b.build_request().unwrap().method, Method::Delete);
    }

    #[test]
    fn test_upsert_prefer_header() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).upsert_with(
            json!({"x": 1}),
            UpsertOptions {
                on_conflict: Some("id".into()),
            },
        );

        let request = b.build_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(
            request.headers["Prefer"],
            "return=representation,resolution=merge-duplicates,on_conflict=id"
        );

        let b = builder(&transport).upsert(json!({"x": 1}));
        assert_eq!(
            b.build_request().unwrap().headers["Prefer"],
            "return=representation,resolution=merge-duplicates"
        );
    }

    #[test]
    fn test_caller_prefer_merges_with_mutation() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport)
            .header("Prefer", "tx=rollback")
            .insert(json!({"name": "ada"}));

        let request = b.build_request().unwrap();
        assert_eq!(request.headers["Prefer"], "return=representation,tx=rollback");

        let b = builder(&transport).header("Prefer", "tx=rollback");
        assert_eq!(b.build_request().unwrap().headers["Prefer"], "tx=rollback");
    }

    #[test]
    fn test_caller_prefer_cannot_change_return_mode() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport)
            .header("Prefer", "return=minimal")
            .select_with(
                "*",
                SelectOptions {
                    count: Some(Count::Exact),
                    head: false,
                },
            )
            .delete();

        assert_eq!(
            b.build_request().unwrap().headers["Prefer"],
            "return=representation,count=exact"
        );
    }

    #[test]
    fn test_invalid_header_is_deferred() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).header("X-Note", "two\nlines").eq("id", 1);

        assert!(matches!(
            b.error(),
            Some(QueryError::InvalidHeader { name, .. }) if name == "X-Note"
        ));
        assert!(b.build_request().is_err());
    }

    #[test]
    fn test_single_forces_accept_header() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).single();
        assert_eq!(b.state().mode, ResultMode::Single);
        assert_eq!(
            b.build_request().unwrap().headers["Accept"],
            "application/vnd.pgrst.object+json"
        );

        let b = builder(&transport).maybe_single();
        assert_eq!(b.state().mode, ResultMode::MaybeSingle);
        assert_eq!(
            b.build_request().unwrap().headers["Accept"],
            "application/vnd.pgrst.object+json"
        );
    }

    #[test]
    fn test_chaining_does_not_send() {
        let transport = Arc::new(RecordingTransport::new());
        let _ = builder(&transport).eq("id", 1).insert(json!({"a": 1})).single();
        assert!(transport.is_empty());
    }

    #[tokio::test]
    async fn test_await_twice_sends_twice() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).insert(json!({"name": "ada"}));

        let first = (&b).await.unwrap();
        let second = (&b).await.unwrap();

        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(transport.len(), 2);
        let requests = transport.requests();
        assert_eq!(requests[0], requests[1]);
        assert_eq!(requests[0].method, Method::Post);
    }

    #[tokio::test]
    async fn test_delete_executed_twice_is_not_deduplicated() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).delete().eq("id", 1);

        b.execute().await.unwrap();
        b.execute().await.unwrap();

        assert_eq!(transport.len(), 2);
        assert!(transport
            .requests()
            .iter()
            .all(|r| r.method == Method::Delete && r.url.ends_with("?id=eq.1")));
    }

    #[tokio::test]
    async fn test_reexecution_reflects_later_chain_calls() {
        let transport = Arc::new(RecordingTransport::new());
        let b = builder(&transport).eq("id", 1);
        b.execute().await.unwrap();

        let b = b.eq("team", "red");
        b.execute().await.unwrap();

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:3000/users?id=eq.1",
                "http://localhost:3000/users?id=eq.1&team=eq.red",
            ]
        );
    }

    #[tokio::test]
    async fn test_owned_await() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond(HttpResponse::new(200, r#"[{"a":1}]"#));

        let response = builder(&transport).single().await.unwrap();
        assert_eq!(response.data, Some(json!({"a": 1})));
        assert_eq!(response.error, None);
    }

    #[tokio::test]
    async fn test_head_only_count() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond(HttpResponse::new(200, r#"[{"a":1}]"#).with_header("Content-Range", "0-0/17"));

        let response = builder(&transport)
            .select_with(
                "*",
                SelectOptions {
                    count: Some(Count::Exact),
                    head: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(response.data, None);
        assert_eq!(response.error, None);
        assert_eq!(response.count, Some(17));
    }

    #[tokio::test]
    async fn test_head_only_error_uses_status_text() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond(HttpResponse::new(
            401,
            r#"{"message":"JWT expired","code":"PGRST301"}"#,
        ));

        let response = builder(&transport)
            .select_with(
                "*",
                SelectOptions {
                    count: Some(Count::Exact),
                    head: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(response.data, None);
        assert_eq!(response.count, None);
        assert_eq!(response.status, Some(401));
        assert_eq!(response.error, Some(PostgrestError::new("Unauthorized")));
    }

    #[tokio::test]
    async fn test_backend_error_resolves_to_envelope() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond(HttpResponse::new(409, r#"{"message":"bad","code":"23505"}"#));

        let response = builder(&transport).insert(json!({"id": 1})).await.unwrap();
        assert_eq!(response.data, None);
        let error = response.error.unwrap();
        assert_eq!(error.message, "bad");
        assert_eq!(error.code.as_deref(), Some("23505"));
    }

    #[tokio::test]
    async fn test_misuse_fails_before_sending() {
        let transport = Arc::new(RecordingTransport::new());
        let mut bad = HashMap::new();
        bad.insert((1, 2), "x");

        let b = builder(&transport).eq("id", 1).insert(bad).match_(json!([1]));
        let err = b.execute().await.unwrap_err();

        assert!(matches!(
            err,
            QueryError::Serialize {
                operation: "insert",
                ..
            }
        ));
        assert!(transport.is_empty());
    }
}
