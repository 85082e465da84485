//! The authoritative per-room game state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use setforge_deck::Card;

use crate::{Difficulty, MatchId, PlayerId, RoomId, SnapshotId};

/// Number of cards dealt face up.
pub const BOARD_SIZE: usize = 12;

// ---------------------------------------------------------------------------
// GameStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a room's game.
///
/// ```text
/// Waiting → Active → Finished
/// ```
///
/// Games are normally created directly in `Active`. A status never moves
/// backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    Active,
    Finished,
}

impl GameStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` if moving to `target` keeps the lifecycle monotonic.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Active) | (Self::Active, Self::Finished)
        )
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Active => write!(f, "active"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Every card was claimed.
    BoardCleared,
    /// Deck is empty and the board holds no valid triple.
    DeckExhausted,
    /// Board and deck together hold no valid triple.
    NoSetsRemain,
    /// The room's countdown reached zero.
    TimeExpired,
}

/// A seat driven by the bot coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSeat {
    pub player_id: PlayerId,
    pub difficulty: Difficulty,
    /// Removed from play; never restarted.
    #[serde(default)]
    pub retired: bool,
}

impl BotSeat {
    pub fn new(player_id: PlayerId, difficulty: Difficulty) -> Self {
        Self {
            player_id,
            difficulty,
            retired: false,
        }
    }
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// Root aggregate, one per room.
///
/// Only the game engine mutates it, and only while holding the room's
/// lock. `created_at` anchors every elapsed-time and countdown
/// calculation and is never rewritten after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub room_id: RoomId,

    /// Correlates with persisted history. `None` when the directory was
    /// unavailable at creation time.
    pub match_id: Option<MatchId>,

    pub status: GameStatus,

    /// Undealt cards; the top of the deck is the end of the vector.
    pub deck: Vec<Card>,

    /// Face-up cards. Order is stable until cards are replaced.
    pub board: Vec<Card>,

    /// Score per known player. Never decreases within a game.
    pub scores: HashMap<PlayerId, u32>,

    /// Participants in join order. Ties in the final ranking follow this order.
    pub players: Vec<PlayerId>,

    /// Subset of `players` driven by the bot coordinator.
    #[serde(default)]
    pub bots: Vec<BotSeat>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Incremented by exactly one per accepted claim.
    pub sequence_number: u64,

    /// Most recent persisted board snapshot, referenced by the next move record.
    #[serde(default)]
    pub last_snapshot: Option<SnapshotId>,

    /// Countdown length for this game, if it is timed.
    #[serde(default)]
    pub countdown_secs: Option<u64>,

    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

impl GameState {
    /// Board position of the card with this id, if it is face up.
    pub fn board_position(&self, card_id: &str) -> Option<usize> {
        self.board.iter().position(|c| c.id() == card_id)
    }

    /// Ids of the face-up cards, in board order.
    pub fn board_ids(&self) -> Vec<String> {
        self.board.iter().map(Card::id).collect()
    }

    pub fn score_of(&self, player: &PlayerId) -> u32 {
        self.scores.get(player).copied().unwrap_or(0)
    }

    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    pub fn is_bot(&self, player: &PlayerId) -> bool {
        self.bots.iter().any(|b| &b.player_id == player)
    }

    /// Marks `player`'s bot seat retired. Seat and score stay. Returns
    /// `false` if it is not a bot or was already retired.
    pub fn retire_bot(&mut self, player: &PlayerId) -> bool {
        match self
            .bots
            .iter_mut()
            .find(|b| &b.player_id == player && !b.retired)
        {
            Some(seat) => {
                seat.retired = true;
                true
            }
            None => false,
        }
    }

    /// Bot seats that should be playing.
    pub fn active_bots(&self) -> impl Iterator<Item = &BotSeat> {
        self.bots.iter().filter(|b| !b.retired)
    }

    /// Milliseconds since the game was created, as of `now`.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.created_at).num_milliseconds().max(0) as u64
    }
}
