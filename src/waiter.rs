//! Parked acquires and the handler types they carry.

use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;

/// Handler invoked with the acquired connection.
pub type ReadyHandler<C> = Box<dyn FnOnce(Arc<C>) + Send + 'static>;

/// Handler invoked with the terminal error of an acquire.
pub type ErrorHandler = Box<dyn FnOnce(Error) + Send + 'static>;

/// Advisory cancellation probe. Consulted lazily, only when the parked
/// acquire reaches the head of the waiter queue; a probe returning `true`
/// discards the waiter silently.
pub type CancelProbe = Box<dyn Fn() -> bool + Send + 'static>;

/// A suspended acquire: parked until a connection frees up or capacity
/// opens, then resumed on its own context.
pub(crate) struct Waiter<C> {
    pub(crate) handler: ReadyHandler<C>,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) context: Context,
    pub(crate) cancel_probe: CancelProbe,
}

impl<C> Waiter<C> {
    pub(crate) fn new(
        handler: ReadyHandler<C>,
        error_handler: ErrorHandler,
        context: Context,
        cancel_probe: CancelProbe,
    ) -> Self {
        Self {
            handler,
            error_handler,
            context,
            cancel_probe,
        }
    }
}
