//! berth — context-affine HTTP client connection pooling.
//!
//! berth multiplexes many logical HTTP requests, issued from many concurrent
//! execution contexts, onto a bounded set of persistent connections keyed by
//! destination host and port.
//!
//! * [`ConnectionManager`] routes each acquire to a per-destination queue,
//!   creating queues on demand and dropping them once drained.
//! * Each queue enforces the socket cap, prefers connections already bound
//!   to the caller's [`Context`], parks overflow acquires in a bounded
//!   waiter queue with advisory cancellation, and recycles connections as
//!   the codec reports request / response / close events through
//!   [`Lifecycle`].
//! * [`ResponseBuilder`] chains a buffer-to-value decoder onto an underlying
//!   request and produces a fully-buffered [`BufferedResponse`] with
//!   on-demand re-decoders.
//!
//! The socket connector and the per-connection codec stay external: the pool
//! consumes them through the [`Connect`], [`Poolable`], and [`Lifecycle`]
//! contracts.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use berth::{ConnectionManager, Context, PoolConfig};
//!
//! let manager = ConnectionManager::new(
//!     PoolConfig { max_sockets: 4, ..PoolConfig::default() },
//!     Arc::new(TcpConnector::new()),
//! );
//! let context = Context::new("worker-0")?;
//! manager.get_connection(
//!     "example.com",
//!     80,
//!     |conn| { /* write the request on conn */ },
//!     |err| eprintln!("acquire failed: {err}"),
//!     &context,
//!     || false,
//! );
//! ```

pub mod address;
pub mod body;
pub mod builder;
pub mod config;
pub mod connection;
pub mod connector;
pub mod context;
pub mod error;
pub mod manager;
pub(crate) mod metrics;
mod queue;
pub mod response;
pub mod waiter;

// ── Re-exports: pool ────────────────────────────────────────────────────
pub use address::TargetAddress;
pub use config::PoolConfig;
pub use connection::{Lifecycle, Poolable};
pub use connector::Connect;
pub use context::Context;
pub use error::Error;
pub use manager::ConnectionManager;
pub use waiter::{CancelProbe, ErrorHandler, ReadyHandler};

// ── Re-exports: response pipeline ───────────────────────────────────────
pub use body::Body;
pub use builder::{Charset, JsonObject, RequestSink, ResponseBuilder, ResponseCallback};
pub use response::{BufferedResponse, ClientResponse, HttpVersion, ResponseHead};
