//! The authoritative game engine for Setforge.
//!
//! [`GameEngine`] owns every transition of a room's `GameState`: creating
//! a game, applying claims, seating late joiners, expiring the clock and
//! rebuilding state from history after a restart. It talks to three
//! collaborators through traits:
//!
//! - a [`StateStore`](setforge_store::StateStore) for the live state
//! - a [`HistoryWriter`] for append-only moves and snapshots
//! - a [`RoomDirectory`] for rooms, matches, participants and results

mod board;
mod directory;
mod engine;
mod error;
mod finish;
mod history;
mod settings;

pub use board::{Repair, fill, repair, replace};
pub use directory::{
    CODE_ALPHABET, CODE_LEN, DirectoryError, InMemoryDirectory, MatchRecord, MatchStatus,
    Participant, RoomDirectory, RoomRecord, generate_code,
};
pub use engine::GameEngine;
pub use error::EngineError;
pub use finish::{standings, termination};
pub use history::{HistoryError, HistoryWriter, InMemoryHistory};
pub use settings::GameSettings;
