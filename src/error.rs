use std::io;

use crate::builder::Charset;

/// Errors produced by the connection pool and the response pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected pool configuration.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(&'static str),

    /// The wait queue for a destination is saturated.
    #[error("connection pool reached max wait queue size of {max_wait_queue_size}")]
    PoolTooBusy {
        /// The configured bound that was hit.
        max_wait_queue_size: i32,
    },

    /// The connector failed to establish a connection.
    #[error("connect error: {0}")]
    Connect(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The connection was closed before the response completed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The response body is not valid JSON, or does not match the target type.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response body is not valid text in the requested charset.
    #[error("response body is not valid {charset}")]
    Encoding {
        /// The charset the decode was attempted with.
        charset: Charset,
    },
}
