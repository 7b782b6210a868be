//! Top-level connection router.
//!
//! Maps each destination to its per-destination queue, creating queues on
//! demand and letting them evict themselves once drained.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::address::TargetAddress;
use crate::config::PoolConfig;
use crate::connection::Poolable;
use crate::connector::Connect;
use crate::context::Context;
use crate::error::Error;
use crate::queue::ConnQueue;
use crate::waiter::Waiter;

/// Routes acquires to per-destination queues and owns the pool
/// configuration and connector.
///
/// Cheap to share: internally one map guarded by a mutex, with each queue
/// carrying its own lock.
pub struct ConnectionManager<C: Poolable> {
    shared: Arc<Shared<C>>,
}

pub(crate) struct Shared<C: Poolable> {
    pub(crate) config: PoolConfig,
    pub(crate) connector: Arc<dyn Connect<Conn = C>>,
    pub(crate) queues: Mutex<HashMap<TargetAddress, Arc<ConnQueue<C>>>>,
}

impl<C: Poolable> ConnectionManager<C> {
    /// Create a manager over `connector` with the given pool configuration.
    pub fn new(config: PoolConfig, connector: Arc<dyn Connect<Conn = C>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                queues: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Acquire a connection to `host:port`.
    ///
    /// Exactly one of `on_ready` and `on_error` is eventually invoked —
    /// unless the caller cancels through `cancel_probe`, in which case
    /// neither is. `on_ready` runs on `context`; configuration and
    /// capacity rejections invoke `on_error` synchronously on the caller's
    /// stack.
    pub fn get_connection(
        &self,
        host: &str,
        port: u16,
        on_ready: impl FnOnce(Arc<C>) + Send + 'static,
        on_error: impl FnOnce(Error) + Send + 'static,
        context: &Context,
        cancel_probe: impl Fn() -> bool + Send + 'static,
    ) {
        if let Err(error) = self.shared.config.validate() {
            on_error(error);
            return;
        }
        let address = TargetAddress::new(host, port);
        let mut waiter = Waiter::new(
            Box::new(on_ready),
            Box::new(on_error),
            context.clone(),
            Box::new(cancel_probe),
        );
        loop {
            let queue = {
                let mut queues = self.shared.queues.lock().unwrap();
                Arc::clone(queues.entry(address.clone()).or_insert_with(|| {
                    ConnQueue::new(
                        address.clone(),
                        self.shared.config,
                        Arc::downgrade(&self.shared),
                    )
                }))
            };
            match queue.acquire(waiter) {
                Ok(()) => return,
                // Lost a race against eviction; re-resolve and retry.
                Err(parked) => waiter = parked,
            }
        }
    }

    /// Close every pooled connection and drop all queues. Idempotent.
    ///
    /// Queues are marked dead under the map lock, so a connect completing
    /// concurrently can no longer register its connection anywhere; the
    /// connections themselves are closed after the lock is released.
    pub fn close(&self) {
        let queues: Vec<Arc<ConnQueue<C>>> = {
            let mut map = self.shared.queues.lock().unwrap();
            for queue in map.values() {
                queue.mark_evicted();
            }
            map.drain().map(|(_, queue)| queue).collect()
        };
        for queue in queues {
            queue.close_all_connections();
        }
    }

    /// Number of live per-destination queues.
    pub fn queue_count(&self) -> usize {
        self.shared.queues.lock().unwrap().len()
    }
}
