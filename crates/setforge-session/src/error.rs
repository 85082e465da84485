use setforge_protocol::{ConnectionId, PlayerId};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The [`Authenticator`](crate::Authenticator) rejected the token.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("session not found for player {0}")]
    NotFound(PlayerId),

    #[error("no session on connection {0}")]
    UnknownConnection(ConnectionId),

    /// Not a token this server issued, or one already cleaned up.
    #[error("invalid reconnection token")]
    InvalidToken,

    /// The reconnection grace period has elapsed.
    #[error("session expired for player {0}")]
    SessionExpired(PlayerId),

    /// A player can only hold one connected session.
    #[error("player {0} already has an active session")]
    AlreadyConnected(PlayerId),
}
