//! The countdown registry and its timer tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use setforge_protocol::{MatchId, RoomId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};

use crate::CountdownConfig;

// ---------------------------------------------------------------------------
// Remaining-time arithmetic
// ---------------------------------------------------------------------------

/// Milliseconds left on a `duration_secs` countdown that began at
/// `started_at`, as of `now`. Negative once the deadline has passed.
pub fn remaining_ms(duration_secs: u64, started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let elapsed = (now - started_at).num_milliseconds();
    (duration_secs as i64).saturating_mul(1000) - elapsed
}

/// Whole seconds left, rounded up, never negative.
pub fn remaining_secs(duration_secs: u64, started_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    ceil_secs(remaining_ms(duration_secs, started_at, now).max(0) as u64)
}

fn ceil_secs(ms: u64) -> u64 {
    ms.div_ceil(1000)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick {
        room: RoomId,
        match_id: Option<MatchId>,
        remaining_secs: u64,
    },
    /// Sent exactly once per timer, after which the timer is gone.
    Expired {
        room: RoomId,
        match_id: Option<MatchId>,
    },
}

impl CountdownEvent {
    pub fn room(&self) -> &RoomId {
        match self {
            Self::Tick { room, .. } | Self::Expired { room, .. } => room,
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

struct Timer {
    generation: u64,
    match_id: Option<MatchId>,
    started_at: DateTime<Utc>,
    duration_secs: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    next_generation: u64,
    timers: HashMap<RoomId, Timer>,
}

/// Owns at most one running countdown per room.
pub struct CountdownCoordinator {
    config: CountdownConfig,
    events: mpsc::UnboundedSender<CountdownEvent>,
    registry: Arc<Mutex<Registry>>,
}

impl CountdownCoordinator {
    /// Creates a coordinator and the receiving end of its event channel.
    pub fn new(config: CountdownConfig) -> (Self, mpsc::UnboundedReceiver<CountdownEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            config: config.validated(),
            events: tx,
            registry: Arc::new(Mutex::new(Registry::default())),
        };
        (coordinator, rx)
    }

    /// Starts a countdown beginning now, replacing any timer for `room`.
    pub fn start(&self, room: RoomId, match_id: Option<MatchId>, duration_secs: u64) {
        self.resume(room, match_id, duration_secs, Utc::now());
    }

    /// (Re)starts a countdown that began at `started_at`.
    ///
    /// The budget is what is left of `duration_secs` measured from
    /// `started_at`, so resuming never adds time. A countdown whose
    /// deadline already passed expires immediately.
    pub fn resume(
        &self,
        room: RoomId,
        match_id: Option<MatchId>,
        duration_secs: u64,
        started_at: DateTime<Utc>,
    ) {
        let left_ms = remaining_ms(duration_secs, started_at, Utc::now()).max(0) as u64;
        let deadline = Instant::now() + Duration::from_millis(left_ms);

        let mut registry = self.lock();
        registry.next_generation += 1;
        let generation = registry.next_generation;

        let jitter = if self.config.initial_jitter.is_zero() || left_ms == 0 {
            Duration::ZERO
        } else {
            let max = self.config.initial_jitter.as_micros() as u64;
            Duration::from_micros(rand::rng().random_range(0..max))
        };

        let task = TimerTask {
            room: room.clone(),
            match_id,
            generation,
            deadline,
            interval: self.config.tick_interval,
            jitter,
            events: self.events.clone(),
            registry: Arc::clone(&self.registry),
        };
        let handle = tokio::spawn(task.run());

        let previous = registry.timers.insert(
            room.clone(),
            Timer {
                generation,
                match_id,
                started_at,
                duration_secs,
                deadline,
                handle,
            },
        );
        if let Some(previous) = previous {
            previous.handle.abort();
            debug!(room_id = %room, "countdown replaced");
        }
        info!(
            room_id = %room,
            match_id = ?match_id,
            duration_secs,
            remaining_ms = left_ms,
            "countdown running"
        );
    }

    /// Cancels the countdown for `room`. Safe to call when none is running.
    pub fn stop(&self, room: &RoomId) {
        if let Some(timer) = self.lock().timers.remove(room) {
            timer.handle.abort();
            debug!(room_id = %room, "countdown stopped");
        }
    }

    /// Whole seconds left for `room`, or `None` if no countdown is running.
    pub fn remaining_time(&self, room: &RoomId) -> Option<u64> {
        let registry = self.lock();
        let timer = registry.timers.get(room)?;
        let left = timer.deadline.saturating_duration_since(Instant::now());
        Some(ceil_secs(left.as_millis() as u64))
    }

    /// When the running countdown for `room` started, and its length.
    pub fn anchor(&self, room: &RoomId) -> Option<(DateTime<Utc>, u64)> {
        let registry = self.lock();
        registry
            .timers
            .get(room)
            .map(|t| (t.started_at, t.duration_secs))
    }

    pub fn match_of(&self, room: &RoomId) -> Option<Option<MatchId>> {
        self.lock().timers.get(room).map(|t| t.match_id)
    }

    pub fn is_running(&self, room: &RoomId) -> bool {
        self.lock().timers.contains_key(room)
    }

    pub fn active_count(&self) -> usize {
        self.lock().timers.len()
    }

    /// Cancels every countdown.
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.lock().timers.drain().collect();
        for (_, timer) in drained {
            timer.handle.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // A panic while holding this lock cannot leave the map inconsistent.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for CountdownCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Timer task
// ---------------------------------------------------------------------------

struct TimerTask {
    room: RoomId,
    match_id: Option<MatchId>,
    generation: u64,
    deadline: Instant,
    interval: Duration,
    jitter: Duration,
    events: mpsc::UnboundedSender<CountdownEvent>,
    registry: Arc<Mutex<Registry>>,
}

impl TimerTask {
    async fn run(self) {
        if !self.jitter.is_zero() {
            time::sleep(self.jitter.min(self.deadline.saturating_duration_since(Instant::now())))
                .await;
        }

        loop {
            let left = self.deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            let remaining_secs = ceil_secs(left.as_millis() as u64).max(1);
            trace!(room_id = %self.room, remaining_secs, "countdown tick");
            let tick = CountdownEvent::Tick {
                room: self.room.clone(),
                match_id: self.match_id,
                remaining_secs,
            };
            if self.events.send(tick).is_err() {
                warn!(room_id = %self.room, "countdown receiver gone, stopping timer");
                self.deregister();
                return;
            }
            time::sleep(self.interval.min(left)).await;
        }

        // Deregister before reporting so that `remaining_time` is already
        // `None` when the receiver handles the expiry.
        if !self.deregister() {
            return;
        }
        info!(room_id = %self.room, match_id = ?self.match_id, "countdown expired");
        let expired = CountdownEvent::Expired {
            room: self.room.clone(),
            match_id: self.match_id,
        };
        if self.events.send(expired).is_err() {
            warn!(room_id = %self.room, "countdown receiver gone, expiry dropped");
        }
    }

    /// Removes this timer from the registry if it is still the current one
    /// for its room. Returns `false` if it was stopped or replaced.
    fn deregister(&self) -> bool {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match registry.timers.get(&self.room) {
            Some(timer) if timer.generation == self.generation => {
                registry.timers.remove(&self.room);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn test_remaining_counts_from_original_start() {
        let now = Utc::now();
        let started = now - TimeDelta::seconds(9);
        assert_eq!(remaining_ms(10, started, now), 1000);
        assert_eq!(remaining_secs(10, started, now), 1);
    }

    #[test]
    fn test_remaining_rounds_partial_seconds_up() {
        let now = Utc::now();
        let started = now - TimeDelta::milliseconds(8_500);
        assert_eq!(remaining_secs(10, started, now), 2);
    }

    #[test]
    fn test_remaining_is_negative_past_deadline() {
        let now = Utc::now();
        let started = now - TimeDelta::seconds(15);
        assert_eq!(remaining_ms(10, started, now), -5000);
        assert_eq!(remaining_secs(10, started, now), 0);
    }
}
