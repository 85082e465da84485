//! Store configuration.

use std::time::Duration;

/// Settings for the fast cache path.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Time-to-live of each cache entry.
    pub ttl: Duration,

    /// Upper bound on any single cache operation, connection included.
    /// When exceeded, the operation counts as "cache unavailable".
    pub op_timeout: Duration,

    /// After a failed connection attempt, skip the cache for this long
    /// instead of paying `op_timeout` on every call.
    pub reconnect_backoff: Duration,

    /// Prefix for every key, e.g. `"setforge"` → `setforge:room:<id>`.
    pub key_prefix: String,
}

impl StoreConfig {
    /// Upper bound for `op_timeout`; anything longer defeats the fallback.
    pub const MAX_OP_TIMEOUT: Duration = Duration::from_secs(5);

    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.op_timeout.is_zero() {
            self.op_timeout = Duration::from_millis(1);
        }
        if self.op_timeout > Self::MAX_OP_TIMEOUT {
            tracing::warn!(
                op_timeout_ms = self.op_timeout.as_millis() as u64,
                "cache op timeout exceeds maximum, clamping"
            );
            self.op_timeout = Self::MAX_OP_TIMEOUT;
        }
        if self.ttl < Duration::from_secs(1) {
            self.ttl = Duration::from_secs(1);
        }
        if self.key_prefix.is_empty() {
            self.key_prefix = "setforge".to_string();
        }
        self
    }

    /// The cache key for a room.
    pub fn room_key(&self, room: &str) -> String {
        format!("{}:room:{}", self.key_prefix, room)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            op_timeout: Duration::from_millis(250),
            reconnect_backoff: Duration::from_secs(5),
            key_prefix: "setforge".to_string(),
        }
    }
}
