//! Session records.

use setforge_protocol::{ConnectionId, PlayerId, RoomId};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected player may take to come back with their
    /// reconnect token. 0 disables reconnection.
    pub reconnect_grace_secs: u64,
}

impl SessionConfig {
    pub const MAX_GRACE_SECS: u64 = 60 * 60;

    /// Clamp out-of-range values so the config is safe to use.
    pub fn validated(mut self) -> Self {
        if self.reconnect_grace_secs > Self::MAX_GRACE_SECS {
            tracing::warn!(
                grace_secs = self.reconnect_grace_secs,
                "reconnect grace too long, clamping"
            );
            self.reconnect_grace_secs = Self::MAX_GRACE_SECS;
        }
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(grace elapsed)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
#[derive(Debug, Clone)]
pub enum SessionState {
    Connected,
    Disconnected { since: Instant },
    Expired,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    pub display_name: String,

    /// The connection currently carrying this session. Kept after a
    /// disconnect so the stale id can be told apart from a new one.
    pub connection: ConnectionId,

    pub state: SessionState,

    /// 32 hex characters. Presented instead of re-authenticating after a
    /// dropped connection.
    pub reconnect_token: String,

    /// The room the player last joined, so a reconnect can put them back.
    pub room: Option<RoomId>,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }
}
