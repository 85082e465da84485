//! Reaction-time distributions.

use std::time::Duration;

use rand::Rng;
use setforge_protocol::Difficulty;

/// Delay between a bot's attempts.
///
/// A sample is `min + (max - min) * u^skew` with `u` uniform in `[0, 1)`.
/// `skew > 1` pushes samples toward `min` (quick reactions), `skew < 1`
/// toward `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotTiming {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub skew: f64,
}

impl BotTiming {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                min_delay: Duration::from_secs(4),
                max_delay: Duration::from_secs(10),
                skew: 0.5,
            },
            Difficulty::Medium => Self {
                min_delay: Duration::from_millis(2_500),
                max_delay: Duration::from_secs(6),
                skew: 1.0,
            },
            Difficulty::Hard => Self {
                min_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(4),
                skew: 2.0,
            },
        }
    }

    /// A fixed delay, handy in tests.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min_delay: delay,
            max_delay: delay,
            skew: 1.0,
        }
    }

    /// Clamp out-of-range values so the timing is safe to use.
    pub fn validated(mut self) -> Self {
        if self.max_delay < self.min_delay {
            std::mem::swap(&mut self.min_delay, &mut self.max_delay);
        }
        if !self.skew.is_finite() || self.skew <= 0.0 {
            tracing::warn!(skew = self.skew, "invalid bot delay skew, using 1.0");
            self.skew = 1.0;
        }
        self
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let span = self.max_delay.saturating_sub(self.min_delay);
        if span.is_zero() {
            return self.min_delay;
        }
        let u: f64 = rng.random();
        self.min_delay + span.mul_f64(u.powf(self.skew))
    }
}

/// Timing per difficulty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotTimings {
    pub easy: BotTiming,
    pub medium: BotTiming,
    pub hard: BotTiming,
}

impl BotTimings {
    pub fn get(&self, difficulty: Difficulty) -> BotTiming {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    /// Same timing for every difficulty.
    pub fn uniform(timing: BotTiming) -> Self {
        Self {
            easy: timing,
            medium: timing,
            hard: timing,
        }
    }

    pub fn validated(self) -> Self {
        Self {
            easy: self.easy.validated(),
            medium: self.medium.validated(),
            hard: self.hard.validated(),
        }
    }
}

impl Default for BotTimings {
    fn default() -> Self {
        Self {
            easy: BotTiming::for_difficulty(Difficulty::Easy),
            medium: BotTiming::for_difficulty(Difficulty::Medium),
            hard: BotTiming::for_difficulty(Difficulty::Hard),
        }
    }
}
