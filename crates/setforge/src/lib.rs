//! # Setforge
//!
//! A real-time multiplayer Set service. Players share a room, watch one
//! board, and race to claim valid sets; the server arbitrates, keeps the
//! state recoverable, and runs an optional countdown and bot opponents.
//!
//! [`GameService`] is the entry point. It wires together:
//!
//! - [`setforge_engine`]: the only code that mutates a room's game
//! - [`setforge_store`]: the fast room-state store with in-process fallback
//! - [`setforge_tick`]: wall-clock anchored countdowns
//! - [`setforge_bots`]: autonomous players
//! - [`setforge_session`]: identities, reconnection and room broadcast
//!
//! ```rust,no_run
//! use setforge::prelude::*;
//!
//! # async fn run() -> Result<(), ServiceError> {
//! let service = GameService::new(ServiceConfig::from_env()?, TrustingAuthenticator)?;
//! let alice = service.connect("alice:Alice").await?;
//! let state = service.join_room(alice.connection, RoomRef::Id(RoomId::new("lobby"))).await?;
//! println!("{} cards on the board", state.board.len());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod service;
pub mod telemetry;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use service::{Connected, GameService, RoomRef};

pub mod prelude {
    pub use crate::{Connected, GameService, RoomRef, ServiceConfig, ServiceError};
    pub use setforge_engine::GameSettings;
    pub use setforge_protocol::{
        ClaimResult, Difficulty, GameState, GameStatus, PlayerId, RoomId, ServerEvent,
    };
    pub use setforge_session::{Authenticator, Identity, TrustingAuthenticator};
}
