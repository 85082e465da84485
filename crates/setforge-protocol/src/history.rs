//! Durable history records and final standings.
//!
//! Moves and snapshots are append-only. They form the audit trail and the
//! recovery substrate, independent of the live `GameState`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use setforge_deck::Card;

use crate::{FinishReason, MatchId, PlayerId, SnapshotId};

/// A persisted copy of the board at one sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub match_id: MatchId,
    pub sequence_number: u64,
    pub board: Vec<Card>,
    pub scores: HashMap<PlayerId, u32>,
    /// Undealt cards at the time; informational only, recovery ignores it.
    pub deck_remaining: usize,
    pub taken_at: DateTime<Utc>,
}

/// One accepted claim. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub card_ids: [String; 3],
    /// Milliseconds since the match started.
    pub offset_ms: u64,
    /// The snapshot this move was applied on top of.
    pub previous_snapshot: Option<SnapshotId>,
}

/// One player's place in the final ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub score: u32,
    /// 1-based; equal scores keep join order and still get distinct ranks.
    pub rank: u32,
}

/// Summary of a finished game, broadcast to the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    pub reason: FinishReason,
    pub standings: Vec<Standing>,
}

/// Final per-player result, written once per human when a match finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub score: u32,
    pub rank: u32,
    pub duration_secs: u64,
}
