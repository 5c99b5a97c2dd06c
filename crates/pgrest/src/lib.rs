//! A deferred, chainable client for PostgREST-compatible endpoints.
//!
//! ```no_run
//! use pgrest::prelude::*;
//!
//! # async fn run() -> pgrest::error::Result<()> {
//! let client = Client::new("http://localhost:3000").api_key("anon");
//!
//! let adults = client
//!     .from("users")
//!     .select("id,name")
//!     .gte("age", 18)
//!     .order_with("name", OrderOptions::descending())
//!     .range(0, 9)
//!     .await?;
//!
//! match adults.into_result() {
//!     Ok(rows) => println!("{rows:?}"),
//!     Err(err) => eprintln!("{err}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Chain calls never touch the network. Each `execute()` or await sends
//! exactly one request; awaiting the same builder again sends another.
//!
//! Requests are sent from tokio's blocking pool, so queries and RPC calls
//! must be awaited inside a tokio runtime. Outside one they resolve to an
//! envelope carrying a transport error instead of sending anything.

pub mod client;
pub mod error;

pub use client::Client;
pub use pgrest_config::{self as config, Config, ConfigError};
pub use pgrest_http as http;
pub use pgrest_query as query;

pub mod prelude {
    pub use pgrest_query::{
        Count, OrderOptions, PostgrestError, PostgrestResponse, QueryBuilder, QueryError,
        SelectOptions, TextSearchType, UpsertOptions,
    };

    pub use crate::{client::Client, Config};
}
