//! Unified error type for the service.

use setforge_engine::{DirectoryError, EngineError};
use setforge_protocol::{ConnectionId, ProtocolError};
use setforge_session::SessionError;
use setforge_store::StoreError;

/// Wraps every crate's error; `?` converts through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad configuration value.
    #[error("configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("no room with code {0}")]
    UnknownRoomCode(String),

    #[error("connection {0} is not in a room")]
    NotInRoom(ConnectionId),
}

impl ServiceError {
    /// HTTP-style status for an [`Error`](setforge_protocol::ServerEvent::Error) event.
    pub fn code(&self) -> u16 {
        match self {
            Self::Session(SessionError::AuthFailed(_) | SessionError::InvalidToken) => 401,
            Self::Session(SessionError::SessionExpired(_)) => 410,
            Self::Session(SessionError::AlreadyConnected(_)) => 409,
            Self::Session(_) | Self::NotInRoom(_) => 400,
            Self::UnknownRoomCode(_)
            | Self::Directory(DirectoryError::RoomNotFound(_))
            | Self::Engine(EngineError::NotFound(_)) => 404,
            Self::Engine(
                EngineError::EmptyRoster
                | EngineError::DuplicatePlayer(_)
                | EngineError::NotActive(_),
            )
            | Self::Protocol(_) => 400,
            Self::Directory(DirectoryError::RoomExists(_)) => 409,
            _ => 500,
        }
    }
}
