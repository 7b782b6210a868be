//! Connection contracts.
//!
//! [`Poolable`] is the handle contract the pool consumes; the per-connection
//! codec that owns the socket drives the pool back through [`Lifecycle`].

use std::sync::Arc;

use crate::context::Context;

/// A pooled connection handle.
///
/// Produced by a [`Connect`](crate::Connect) implementation and owned by one
/// per-destination queue for its lifetime. The context a connection reports
/// never changes.
pub trait Poolable: Send + Sync + 'static {
    /// The execution context the connection was created on.
    fn context(&self) -> &Context;

    /// Whether the underlying socket is gone.
    fn is_closed(&self) -> bool;

    /// Requests started but not yet answered on this connection.
    fn outstanding_request_count(&self) -> usize;

    /// Close the underlying socket. Must eventually emit
    /// [`Lifecycle::connection_closed`] exactly once.
    fn close(&self);
}

/// Lifecycle events the per-connection codec feeds back into the pool.
///
/// Implemented by the per-destination queue; handed to the connector so the
/// codec it wires up can reach the pool.
pub trait Lifecycle<C>: Send + Sync {
    /// The request bytes have been fully written to the socket.
    fn request_ended(&self, conn: &Arc<C>);

    /// The response body has been delivered to the application.
    fn response_ended(&self, conn: &Arc<C>);

    /// The socket is gone (`Some`), or a connection attempt failed (`None`).
    /// Either way one connection slot is released.
    fn connection_closed(&self, conn: Option<&Arc<C>>);
}
