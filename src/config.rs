//! Pool configuration.

use crate::error::Error;

/// Configuration for a [`ConnectionManager`](crate::ConnectionManager).
///
/// Set once at construction and shared by every per-destination queue.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Maximum open sockets per destination. Counts established connections
    /// and in-flight connection attempts. Must be greater than zero.
    pub max_sockets: u32,
    /// Keep a connection open after its response completes so it can be
    /// reused by a later request.
    pub keep_alive: bool,
    /// Issue multiple requests on one connection before their responses
    /// arrive. Requires `keep_alive`.
    pub pipelining: bool,
    /// Maximum parked acquires per destination. Negative means unbounded;
    /// zero rejects every acquire that would otherwise wait.
    pub max_wait_queue_size: i32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sockets: 5,
            keep_alive: true,
            pipelining: false,
            max_wait_queue_size: -1,
        }
    }
}

impl PoolConfig {
    /// Validate configuration values. Returns an error if any value is out
    /// of range or the flags contradict each other.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_sockets == 0 {
            return Err(Error::InvalidConfig("max_sockets must be greater than zero"));
        }
        if self.pipelining && !self.keep_alive {
            return Err(Error::InvalidConfig("pipelining requires keep-alive"));
        }
        Ok(())
    }
}
