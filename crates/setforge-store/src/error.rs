//! Error types for the store layer.
//!
//! These never reach engine callers: the resilient store turns every one
//! of them into "use the fallback".

use setforge_protocol::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The operation did not finish within the configured bound.
    #[error("cache {0} timed out")]
    Timeout(&'static str),

    /// The backend is known to be down (e.g. inside the reconnect backoff).
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Codec(#[from] ProtocolError),
}
