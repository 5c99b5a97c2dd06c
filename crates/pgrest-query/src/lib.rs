//! Deferred PostgREST queries.
//!
//! A [`QueryBuilder`] accumulates a table name, projection, filters,
//! ordering, limits and an optional mutation. Nothing is sent until it is
//! executed; each execution issues exactly one HTTP request and resolves to
//! a [`PostgrestResponse`] envelope.
//!
//! Executing a query runs the blocking transport on the current tokio
//! runtime's blocking pool, so futures must be awaited inside a tokio
//! runtime. Outside one they resolve to an envelope whose `error` reports
//! the missing runtime; nothing is sent.

use std::{future::Future, pin::Pin};

pub mod builder;
pub mod coerce;
pub mod error;
pub mod executor;
pub mod filter;
pub mod response;
pub mod state;

pub use builder::QueryBuilder;
pub use error::QueryError;
pub use filter::{FilterEntry, Logic, Operator, TextSearchType};
pub use response::{PostgrestError, PostgrestResponse, DECODE_ERROR_CODE};
pub use state::{Count, Mutation, OrderOptions, QueryState, ResultMode, SelectOptions, UpsertOptions};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
