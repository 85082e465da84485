//! Countdown configuration.

use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct CountdownConfig {
    /// How often a running countdown reports the remaining time.
    pub tick_interval: Duration,

    /// Random delay (0..max) before a timer's first tick, to keep rooms
    /// created at the same instant from ticking in lockstep. Never
    /// delays expiry.
    pub initial_jitter: Duration,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            initial_jitter: Duration::from_millis(50),
        }
    }
}

impl CountdownConfig {
    pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(10);
    pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by [`CountdownCoordinator::new`](crate::CountdownCoordinator::new).
    pub fn validated(mut self) -> Self {
        if self.tick_interval < Self::MIN_TICK_INTERVAL {
            warn!(
                interval_ms = self.tick_interval.as_millis() as u64,
                "tick_interval below minimum, clamping"
            );
            self.tick_interval = Self::MIN_TICK_INTERVAL;
        }
        if self.tick_interval > Self::MAX_TICK_INTERVAL {
            warn!(
                interval_ms = self.tick_interval.as_millis() as u64,
                "tick_interval above maximum, clamping"
            );
            self.tick_interval = Self::MAX_TICK_INTERVAL;
        }
        if self.initial_jitter > self.tick_interval {
            self.initial_jitter = self.tick_interval;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ticks_every_second() {
        assert_eq!(CountdownConfig::default().tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_validated_clamps_interval_and_jitter() {
        let cfg = CountdownConfig {
            tick_interval: Duration::ZERO,
            initial_jitter: Duration::from_secs(5),
        }
        .validated();
        assert_eq!(cfg.tick_interval, CountdownConfig::MIN_TICK_INTERVAL);
        assert_eq!(cfg.initial_jitter, CountdownConfig::MIN_TICK_INTERVAL);
    }
}
