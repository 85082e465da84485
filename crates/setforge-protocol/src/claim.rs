//! Claim outcomes.
//!
//! A rejected claim is an ordinary, expected result: it travels back to
//! the claimant inside a [`ClaimResult`], never as an `Err`.

use serde::{Deserialize, Serialize};
use setforge_deck::Card;

use crate::{FinishReason, GameOver};

/// Why a claim was rejected. No state changes when any of these occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClaimError {
    #[error("no game in this room")]
    GameNotFound,

    #[error("game is not active")]
    GameNotActive,

    #[error("a claim needs exactly 3 cards, got {got}")]
    InvalidClaimSize { got: usize },

    /// Someone else took this card first, or it was never dealt.
    #[error("card {card_id} is not on the board")]
    CardNotOnBoard { card_id: String },

    #[error("those cards do not form a set")]
    InvalidSet,
}

/// The answer to a claim, for the claimant and for broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimResult {
    pub success: bool,
    pub message: String,

    /// Set when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ClaimError>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_board: Option<Vec<Card>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_deck: Option<Vec<Card>>,

    /// Claimant's score after the claim.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub score: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sequence_number: Option<u64>,

    /// Present when this claim ended the game.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub game_over: Option<GameOver>,
}

impl ClaimResult {
    pub fn rejected(error: ClaimError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            error: Some(error),
            new_board: None,
            new_deck: None,
            score: None,
            sequence_number: None,
            game_over: None,
        }
    }

    pub fn accepted(
        board: Vec<Card>,
        deck: Vec<Card>,
        score: u32,
        sequence_number: u64,
        game_over: Option<GameOver>,
    ) -> Self {
        Self {
            success: true,
            message: "set accepted".to_string(),
            error: None,
            new_board: Some(board),
            new_deck: Some(deck),
            score: Some(score),
            sequence_number: Some(sequence_number),
            game_over,
        }
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.game_over.as_ref().map(|g| g.reason)
    }
}
