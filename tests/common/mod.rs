//! Scripted connector and connection used by the pool tests.
//!
//! `MockConnection` plays the codec's side of the lifecycle contract: tests
//! drive `begin_request` / `finish_request` / `finish_response` and the
//! events flow back into the pool. `MockConnector` either completes
//! connects immediately (auto) or holds them for the test to settle
//! (manual).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use berth::{
    Connect, ConnectionManager, Context, Error, ErrorHandler, Lifecycle, PoolConfig, Poolable,
    ReadyHandler,
};

pub struct MockConnection {
    context: Context,
    closed: AtomicBool,
    outstanding: AtomicUsize,
    lifecycle: Arc<dyn Lifecycle<MockConnection>>,
    me: Weak<MockConnection>,
}

impl MockConnection {
    fn new(context: Context, lifecycle: Arc<dyn Lifecycle<MockConnection>>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            context,
            closed: AtomicBool::new(false),
            outstanding: AtomicUsize::new(0),
            lifecycle,
            me: me.clone(),
        })
    }

    fn me(&self) -> Arc<MockConnection> {
        self.me.upgrade().expect("connection outlived its Arc")
    }

    /// A request started on this connection.
    pub fn begin_request(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    /// The request bytes were fully written.
    pub fn finish_request(&self) {
        self.lifecycle.request_ended(&self.me());
    }

    /// The response body was fully delivered.
    pub fn finish_response(&self) {
        let _ = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        self.lifecycle.response_ended(&self.me());
    }
}

impl Poolable for MockConnection {
    fn context(&self) -> &Context {
        &self.context
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn outstanding_request_count(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.lifecycle.connection_closed(Some(&self.me()));
        }
    }
}

struct PendingConnect {
    on_connected: ReadyHandler<MockConnection>,
    on_connect_error: ErrorHandler,
    context: Context,
    lifecycle: Arc<dyn Lifecycle<MockConnection>>,
}

#[derive(Default)]
struct ConnectorState {
    connects: usize,
    fail_remaining: usize,
    created: Vec<Arc<MockConnection>>,
    pending: VecDeque<PendingConnect>,
}

pub struct MockConnector {
    auto: bool,
    state: Mutex<ConnectorState>,
}

impl MockConnector {
    /// Connector that settles every connect as soon as it is issued.
    pub fn auto() -> Arc<Self> {
        Arc::new(Self {
            auto: true,
            state: Mutex::new(ConnectorState::default()),
        })
    }

    /// Connector that holds connects until the test settles them.
    pub fn manual() -> Arc<Self> {
        Arc::new(Self {
            auto: false,
            state: Mutex::new(ConnectorState::default()),
        })
    }

    /// Fail the next `n` connects (auto mode).
    pub fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().fail_remaining = n;
    }

    /// Total connects issued so far.
    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// Every connection created so far.
    pub fn created(&self) -> Vec<Arc<MockConnection>> {
        self.state.lock().unwrap().created.clone()
    }

    /// Settle the oldest held connect successfully (manual mode).
    pub fn complete_next(&self) {
        let pending = self
            .state
            .lock()
            .unwrap()
            .pending
            .pop_front()
            .expect("no pending connect");
        let conn = MockConnection::new(pending.context.clone(), pending.lifecycle);
        self.state.lock().unwrap().created.push(Arc::clone(&conn));
        let on_connected = pending.on_connected;
        pending.context.run(move || on_connected(conn));
    }

    /// Settle the oldest held connect with a failure (manual mode).
    pub fn fail_next_pending(&self) {
        let pending = self
            .state
            .lock()
            .unwrap()
            .pending
            .pop_front()
            .expect("no pending connect");
        (pending.on_connect_error)(Error::Connect("connection refused".to_string()));
        pending.lifecycle.connection_closed(None);
    }
}

impl Connect for MockConnector {
    type Conn = MockConnection;

    fn connect(
        &self,
        _host: &str,
        _port: u16,
        on_connected: ReadyHandler<MockConnection>,
        on_connect_error: ErrorHandler,
        context: &Context,
        lifecycle: Arc<dyn Lifecycle<MockConnection>>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;

        if !self.auto {
            state.pending.push_back(PendingConnect {
                on_connected,
                on_connect_error,
                context: context.clone(),
                lifecycle,
            });
            return;
        }

        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            drop(state);
            context.run(move || {
                on_connect_error(Error::Connect("connection refused".to_string()));
                lifecycle.connection_closed(None);
            });
            return;
        }

        let conn = MockConnection::new(context.clone(), lifecycle);
        state.created.push(Arc::clone(&conn));
        drop(state);
        context.run(move || on_connected(conn));
    }
}

pub enum Outcome {
    Ready(Arc<MockConnection>),
    Failed(Error),
}

pub fn pool(
    config: PoolConfig,
    connector: &Arc<MockConnector>,
) -> ConnectionManager<MockConnection> {
    let connector: Arc<dyn Connect<Conn = MockConnection>> = Arc::clone(connector) as Arc<dyn Connect<Conn = MockConnection>>;
    ConnectionManager::new(config, connector)
}

/// Issue an acquire and return a receiver for its terminal outcome.
pub fn acquire(
    manager: &ConnectionManager<MockConnection>,
    host: &str,
    context: &Context,
) -> Receiver<Outcome> {
    acquire_with_probe(manager, host, context, Arc::new(AtomicBool::new(false)))
}

/// Issue an acquire whose cancellation probe reads `cancelled`.
pub fn acquire_with_probe(
    manager: &ConnectionManager<MockConnection>,
    host: &str,
    context: &Context,
    cancelled: Arc<AtomicBool>,
) -> Receiver<Outcome> {
    let (tx, rx) = channel();
    let tx_err = tx.clone();
    manager.get_connection(
        host,
        80,
        move |conn| {
            let _ = tx.send(Outcome::Ready(conn));
        },
        move |err| {
            let _ = tx_err.send(Outcome::Failed(err));
        },
        context,
        move || cancelled.load(Ordering::SeqCst),
    );
    rx
}

pub fn expect_ready(rx: &Receiver<Outcome>) -> Arc<MockConnection> {
    match rx.recv_timeout(Duration::from_secs(5)) {
        Ok(Outcome::Ready(conn)) => conn,
        Ok(Outcome::Failed(err)) => panic!("expected a connection, got error: {err}"),
        Err(_) => panic!("acquire did not complete"),
    }
}

pub fn expect_error(rx: &Receiver<Outcome>) -> Error {
    match rx.recv_timeout(Duration::from_secs(5)) {
        Ok(Outcome::Failed(err)) => err,
        Ok(Outcome::Ready(_)) => panic!("expected an error, got a connection"),
        Err(_) => panic!("acquire did not complete"),
    }
}

pub fn expect_silence(rx: &Receiver<Outcome>) {
    assert!(
        rx.recv_timeout(Duration::from_millis(300)).is_err(),
        "acquire completed but should have stayed silent"
    );
}
