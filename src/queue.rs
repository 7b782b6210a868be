//! Per-destination connection queue.
//!
//! One `ConnQueue` exists per `(host, port)` target. It tracks every open
//! connection to that target, the idle subset, and the acquires parked
//! waiting for capacity. All transitions run under one per-queue mutex; user
//! handlers are never invoked while the lock is held. Each entry point
//! computes a list of deferred actions under the lock and performs them
//! after releasing it, so lifecycle callbacks re-entering the queue (a
//! `close()` that reports `connection_closed` on the same call stack, for
//! instance) never meet a lock that is already taken.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use crate::address::TargetAddress;
use crate::config::PoolConfig;
use crate::connection::{Lifecycle, Poolable};
use crate::context::Context;
use crate::error::Error;
use crate::manager::Shared;
use crate::metrics;
use crate::waiter::{ErrorHandler, ReadyHandler, Waiter};

pub(crate) struct ConnQueue<C: Poolable> {
    address: TargetAddress,
    config: PoolConfig,
    shared: Weak<Shared<C>>,
    me: Weak<ConnQueue<C>>,
    state: Mutex<QueueState<C>>,
}

struct QueueState<C> {
    /// Every open connection to the target, idle or in use.
    all: Vec<Arc<C>>,
    /// Idle connections, oldest at the head.
    available: VecDeque<Arc<C>>,
    /// Parked acquires, FIFO modulo lazy cancellation harvesting.
    waiters: VecDeque<Waiter<C>>,
    /// Established connections plus in-flight connection attempts.
    conn_count: u32,
    /// Set once the queue has been removed from the manager map; acquires
    /// and registrations arriving after that must not land here.
    evicted: bool,
}

/// Work deferred until the queue lock is released.
enum Action<C: Poolable> {
    /// Schedule the ready handler with `conn` on the waiter's context.
    Ready {
        context: Context,
        handler: ReadyHandler<C>,
        conn: Arc<C>,
    },
    /// Reject the acquire synchronously on the caller's stack.
    Reject { handler: ErrorHandler, error: Error },
    /// Close a connection; its close event settles the accounting.
    Close(Arc<C>),
    /// Open a new connection for a waiter. `conn_count` is already charged.
    Connect(Waiter<C>),
    /// Try to remove this queue from the manager map.
    Evict,
}

impl<C: Poolable> ConnQueue<C> {
    pub(crate) fn new(
        address: TargetAddress,
        config: PoolConfig,
        shared: Weak<Shared<C>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| ConnQueue {
            address,
            config,
            shared,
            me: me.clone(),
            state: Mutex::new(QueueState {
                all: Vec::new(),
                available: VecDeque::new(),
                waiters: VecDeque::new(),
                conn_count: 0,
                evicted: false,
            }),
        })
    }

    /// Acquire a connection for `waiter`, park it, or reject it.
    ///
    /// Hands the waiter back when the queue has already been evicted from
    /// the manager map; the caller re-resolves the queue and retries.
    pub(crate) fn acquire(&self, waiter: Waiter<C>) -> Result<(), Waiter<C>> {
        let mut actions = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            if state.evicted {
                return Err(waiter);
            }
            Self::acquire_locked(&self.config, &mut state, waiter, &mut actions);
        }
        self.perform(actions);
        Ok(())
    }

    /// The acquire state machine. Runs with the queue lock held; also the
    /// re-entry point when `response_ended` frees a connection with a
    /// context-agnostic waiter parked.
    fn acquire_locked(
        config: &PoolConfig,
        state: &mut QueueState<C>,
        waiter: Waiter<C>,
        actions: &mut Vec<Action<C>>,
    ) {
        // Same-context candidate: the head of the idle queue, else a scan.
        let head_matches = state
            .available
            .front()
            .is_some_and(|conn| conn.context() == &waiter.context);
        let candidate = if head_matches {
            state.available.pop_front()
        } else if let Some(pos) = state
            .available
            .iter()
            .position(|conn| conn.context() == &waiter.context)
        {
            state.available.remove(pos)
        } else {
            None
        };

        match candidate {
            Some(conn) if !conn.is_closed() => {
                let Waiter { handler, context, .. } = waiter;
                actions.push(Action::Ready { context, handler, conn });
            }
            // A closed candidate stays off the idle queue; its close event
            // settles the accounting. The acquire falls through.
            _ => {
                if state.available.is_empty() && state.conn_count == config.max_sockets {
                    if config.max_wait_queue_size < 0
                        || state.waiters.len() < config.max_wait_queue_size as usize
                    {
                        metrics::WAITERS_PARKED.increment();
                        state.waiters.push_back(waiter);
                    } else {
                        metrics::ACQUIRES_REJECTED.increment();
                        actions.push(Action::Reject {
                            handler: waiter.error_handler,
                            error: Error::PoolTooBusy {
                                max_wait_queue_size: config.max_wait_queue_size,
                            },
                        });
                    }
                } else {
                    // An idle connection on the wrong context is worth less
                    // than a fresh one on the caller's: close it and open a
                    // new connection instead.
                    if let Some(idle) = state.available.pop_front() {
                        metrics::CONNECTIONS_DISPLACED.increment();
                        actions.push(Action::Close(idle));
                    }
                    state.conn_count += 1;
                    actions.push(Action::Connect(waiter));
                }
            }
        }
    }

    /// Pop the next live waiter, harvesting cancelled ones on the way.
    ///
    /// With `matching` set, a live waiter on a different context is pushed
    /// back on the head and `None` is returned: a peek-with-skip, not a
    /// scan, so waiters keep FIFO order.
    fn next_waiter(state: &mut QueueState<C>, matching: Option<&Context>) -> Option<Waiter<C>> {
        while let Some(waiter) = state.waiters.pop_front() {
            if (waiter.cancel_probe)() {
                metrics::WAITERS_CANCELLED.increment();
                continue;
            }
            if let Some(context) = matching
                && waiter.context != *context
            {
                state.waiters.push_front(waiter);
                return None;
            }
            return Some(waiter);
        }
        None
    }

    pub(crate) fn mark_evicted(&self) {
        self.state.lock().unwrap().evicted = true;
    }

    /// Snapshot and clear the connection set, then close each connection
    /// outside the lock: every close re-enters `connection_closed`.
    pub(crate) fn close_all_connections(&self) {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            std::mem::take(&mut state.all)
        };
        for conn in snapshot {
            metrics::CONNECTIONS_ACTIVE.decrement();
            conn.close();
        }
    }

    fn perform(&self, actions: Vec<Action<C>>) {
        for action in actions {
            match action {
                Action::Ready { context, handler, conn } => {
                    context.run(move || handler(conn));
                }
                Action::Reject { handler, error } => handler(error),
                Action::Close(conn) => conn.close(),
                Action::Connect(waiter) => self.start_connect(waiter),
                Action::Evict => self.evict(),
            }
        }
    }

    /// Kick off a connection attempt for `waiter`. The slot was charged to
    /// `conn_count` inside the critical section that produced the action.
    fn start_connect(&self, waiter: Waiter<C>) {
        let Waiter {
            handler,
            error_handler,
            context,
            ..
        } = waiter;
        let (Some(shared), Some(me)) = (self.shared.upgrade(), self.me.upgrade()) else {
            // The manager is gone; refund the slot through the normal
            // failure path.
            error_handler(Error::Connect("connection manager dropped".into()));
            self.connection_closed(None);
            return;
        };
        let queue = Arc::clone(&me);
        let on_connected: ReadyHandler<C> = Box::new(move |conn| queue.register(conn, handler));
        let lifecycle: Arc<dyn Lifecycle<C>> = me;
        shared.connector.connect(
            self.address.host(),
            self.address.port(),
            on_connected,
            error_handler,
            &context,
            lifecycle,
        );
    }

    /// Add a freshly-connected socket to the pool and hand it to its caller.
    ///
    /// Takes the manager map lock before the queue lock — the barrier that
    /// keeps registration from racing `ConnectionManager::close()`. A
    /// registration that lost that race closes the connection instead; the
    /// caller still gets its one terminal outcome and observes a connection
    /// that is already closed.
    fn register(&self, conn: Arc<C>, handler: ReadyHandler<C>) {
        let rejected = match self.shared.upgrade() {
            Some(shared) => {
                let _map = shared.queues.lock().unwrap();
                let mut state = self.state.lock().unwrap();
                if state.evicted {
                    true
                } else {
                    state.all.push(Arc::clone(&conn));
                    metrics::CONNECTIONS_OPENED.increment();
                    metrics::CONNECTIONS_ACTIVE.increment();
                    false
                }
            }
            None => true,
        };
        if rejected {
            conn.close();
        }
        handler(conn);
    }

    /// Remove this queue from the manager map if it is still empty.
    ///
    /// Lock order is map, then queue state — the same order registration
    /// uses. The emptiness re-check makes an acquire that raced in between
    /// the deciding critical section and this one win: the queue stays.
    fn evict(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let mut queues = shared.queues.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        if state.evicted || state.conn_count != 0 || !state.waiters.is_empty() {
            return;
        }
        state.evicted = true;
        let still_mapped = queues
            .get(&self.address)
            .is_some_and(|current| Arc::ptr_eq(current, &me));
        if still_mapped {
            queues.remove(&self.address);
        }
    }
}

impl<C: Poolable> Lifecycle<C> for ConnQueue<C> {
    fn request_ended(&self, conn: &Arc<C>) {
        let mut actions = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            // Under pipelining the connection can take another request from
            // its own context right away, without leaving the in-use set.
            if self.config.pipelining
                && let Some(waiter) = Self::next_waiter(&mut state, Some(conn.context()))
            {
                let Waiter { handler, context, .. } = waiter;
                actions.push(Action::Ready {
                    context,
                    handler,
                    conn: Arc::clone(conn),
                });
            }
        }
        self.perform(actions);
    }

    fn response_ended(&self, conn: &Arc<C>) {
        let mut actions = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            if self.config.pipelining || self.config.keep_alive {
                if let Some(waiter) = Self::next_waiter(&mut state, Some(conn.context())) {
                    let Waiter { handler, context, .. } = waiter;
                    actions.push(Action::Ready {
                        context,
                        handler,
                        conn: Arc::clone(conn),
                    });
                } else if !self.config.pipelining || conn.outstanding_request_count() == 0 {
                    state.available.push_back(Arc::clone(conn));
                    if let Some(waiter) = Self::next_waiter(&mut state, None) {
                        // Serve the waiter from the just-freed connection or
                        // a fresh one; direct re-entry on the locked state.
                        Self::acquire_locked(&self.config, &mut state, waiter, &mut actions);
                    }
                }
            } else {
                // No keep-alive: close now. The waiter wake rides the
                // connection_closed event so the slot accounting stays
                // single-sourced.
                actions.push(Action::Close(Arc::clone(conn)));
            }
        }
        self.perform(actions);
    }

    fn connection_closed(&self, conn: Option<&Arc<C>>) {
        let mut actions = Vec::new();
        {
            let mut state = self.state.lock().unwrap();
            state.conn_count = state.conn_count.saturating_sub(1);
            match conn {
                Some(closed) => {
                    metrics::CONNECTIONS_CLOSED.increment();
                    if let Some(pos) = state.all.iter().position(|c| Arc::ptr_eq(c, closed)) {
                        state.all.swap_remove(pos);
                        metrics::CONNECTIONS_ACTIVE.decrement();
                    }
                    if let Some(pos) = state.available.iter().position(|c| Arc::ptr_eq(c, closed))
                    {
                        state.available.remove(pos);
                    }
                }
                None => {
                    metrics::CONNECT_FAILURES.increment();
                }
            }
            if let Some(waiter) = Self::next_waiter(&mut state, None) {
                // The freed slot goes to the next waiter as a fresh
                // connection.
                state.conn_count += 1;
                actions.push(Action::Connect(waiter));
            } else if state.conn_count == 0 {
                actions.push(Action::Evict);
            }
        }
        self.perform(actions);
    }
}
