//! Error types for the engine layer.
//!
//! Claim rejections are not errors here; they come back inside a
//! `ClaimResult`. These cover malformed game setup and roster changes.

use setforge_protocol::{PlayerId, RoomId};

use crate::DirectoryError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("a game needs at least one player")]
    EmptyRoster,

    #[error("player {0} listed twice")]
    DuplicatePlayer(PlayerId),

    #[error("no game in room {0}")]
    NotFound(RoomId),

    #[error("game in room {0} is not active")]
    NotActive(RoomId),

    /// The state could not be stored anywhere.
    #[error("could not persist room {0}")]
    Persist(RoomId),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
