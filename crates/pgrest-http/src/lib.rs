//! HTTP plumbing for pgrest.
//!
//! The query layer never talks to the network directly. It hands an owned
//! [`HttpRequest`] to a [`Transport`] and gets an [`HttpResponse`] back.
//! [`UreqTransport`] is the production implementation; tests substitute a
//! recording transport.

pub mod agent;
pub mod error;
pub mod mock;
pub mod transport;

pub use agent::{AgentConfig, UreqTransport};
pub use error::TransportError;
pub use mock::RecordingTransport;
pub use transport::{HttpRequest, HttpResponse, Method, Transport};
pub use ureq::http::{header, HeaderMap, HeaderName, HeaderValue};
