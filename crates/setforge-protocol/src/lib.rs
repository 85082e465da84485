//! Shared types for Setforge.
//!
//! This crate is the vocabulary every other layer speaks:
//!
//! - **Identity** ([`PlayerId`], [`RoomId`], [`MatchId`], …)
//! - **State** ([`GameState`], [`GameStatus`], [`FinishReason`])
//! - **Claims** ([`ClaimResult`], [`ClaimError`])
//! - **History** ([`SnapshotRecord`], [`MoveRecord`], [`MatchResult`])
//! - **Events** ([`ServerEvent`]) pushed to connections
//! - **Codec** ([`Codec`], [`JsonCodec`]) used by the cache backend
//!
//! It holds no logic beyond small accessors; rules live in
//! `setforge-deck`, transitions in `setforge-engine`.

mod claim;
mod codec;
mod error;
mod events;
mod history;
mod state;
mod types;

pub use claim::{ClaimError, ClaimResult};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::ServerEvent;
pub use history::{GameOver, MatchResult, MoveRecord, SnapshotRecord, Standing};
pub use state::{BOARD_SIZE, BotSeat, FinishReason, GameState, GameStatus};
pub use types::{
    ConnectionId, Difficulty, MatchId, PlayerId, PlayerKind, Recipient, RoomId, SnapshotId,
};

pub use setforge_deck::Card;
