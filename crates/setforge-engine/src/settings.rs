//! Per-game settings.

use serde::{Deserialize, Serialize};
use setforge_protocol::Difficulty;

/// Options for a new game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Countdown length. `None` plays until the cards run out.
    pub countdown_secs: Option<u64>,

    /// Autonomous players to seat when the game starts. The engine only
    /// stores this; the service spawns them.
    #[serde(default)]
    pub bots: Vec<Difficulty>,

    /// Fixes the shuffle, for tests and replays.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GameSettings {
    pub const MIN_COUNTDOWN_SECS: u64 = 10;
    pub const MAX_COUNTDOWN_SECS: u64 = 60 * 60;
    pub const MAX_BOTS: usize = 8;

    pub fn timed(secs: u64) -> Self {
        Self {
            countdown_secs: Some(secs),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bots(mut self, bots: impl IntoIterator<Item = Difficulty>) -> Self {
        self.bots = bots.into_iter().collect();
        self
    }

    /// Clamp out-of-range values so the settings are safe to use.
    pub fn validated(mut self) -> Self {
        if let Some(secs) = self.countdown_secs {
            let clamped = secs.clamp(Self::MIN_COUNTDOWN_SECS, Self::MAX_COUNTDOWN_SECS);
            if clamped != secs {
                tracing::warn!(secs, clamped, "countdown out of range, clamping");
            }
            self.countdown_secs = Some(clamped);
        }
        if self.bots.len() > Self::MAX_BOTS {
            tracing::warn!(bots = self.bots.len(), "too many bots, truncating");
            self.bots.truncate(Self::MAX_BOTS);
        }
        self
    }
}
