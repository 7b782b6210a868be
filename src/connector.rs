//! Connector contract.

use std::sync::Arc;

use crate::connection::{Lifecycle, Poolable};
use crate::context::Context;
use crate::waiter::{ErrorHandler, ReadyHandler};

/// Opens a connection to a destination on demand.
///
/// `connect` must not block, and must eventually invoke exactly one of
/// `on_connected` or `on_connect_error`. The returned connection is bound to
/// `context` and `on_connected` is invoked there, so a freshly-opened
/// connection reaches its caller on the caller's own context. All later
/// [`Lifecycle`] events for the connection flow through `lifecycle`.
///
/// On error the implementation must also invoke
/// [`Lifecycle::connection_closed`] with `None` so the pool releases the
/// connection slot charged to the attempt.
pub trait Connect: Send + Sync + 'static {
    /// The connection type this connector produces.
    type Conn: Poolable;

    /// Start a connection attempt to `host:port`.
    fn connect(
        &self,
        host: &str,
        port: u16,
        on_connected: ReadyHandler<Self::Conn>,
        on_connect_error: ErrorHandler,
        context: &Context,
        lifecycle: Arc<dyn Lifecycle<Self::Conn>>,
    );
}
