//! Pool metrics.
//!
//! Counters for connection lifecycle and waiter queue events, registered
//! with `metriken` for Prometheus exposition.

use metriken::{Counter, Gauge, metric};

#[metric(
    name = "berth/connections/opened",
    description = "Total connections successfully established"
)]
pub(crate) static CONNECTIONS_OPENED: Counter = Counter::new();

#[metric(
    name = "berth/connections/closed",
    description = "Total connections closed"
)]
pub(crate) static CONNECTIONS_CLOSED: Counter = Counter::new();

#[metric(
    name = "berth/connections/displaced",
    description = "Idle connections closed to open one on the caller's context"
)]
pub(crate) static CONNECTIONS_DISPLACED: Counter = Counter::new();

#[metric(
    name = "berth/connections/active",
    description = "Connections currently registered with a queue"
)]
pub(crate) static CONNECTIONS_ACTIVE: Gauge = Gauge::new();

#[metric(
    name = "berth/connect/failures",
    description = "Connection attempts that failed"
)]
pub(crate) static CONNECT_FAILURES: Counter = Counter::new();

#[metric(
    name = "berth/waiters/parked",
    description = "Acquires parked waiting for a connection"
)]
pub(crate) static WAITERS_PARKED: Counter = Counter::new();

#[metric(
    name = "berth/waiters/cancelled",
    description = "Parked acquires discarded by their cancellation probe"
)]
pub(crate) static WAITERS_CANCELLED: Counter = Counter::new();

#[metric(
    name = "berth/acquires/rejected",
    description = "Acquires rejected because the wait queue was saturated"
)]
pub(crate) static ACQUIRES_REJECTED: Counter = Counter::new();
