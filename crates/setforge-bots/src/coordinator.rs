//! Runs one task per autonomous player.
//!
//! A bot waits a difficulty-dependent delay, looks at the board, and claims
//! whatever its policy picks. Losing a race to another player is normal;
//! the bot simply tries again after its next delay. A bot stops when it is
//! removed, when its room's game ends, or when the room disappears.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::SeedableRng;
use rand::rngs::StdRng;
use setforge_protocol::{Difficulty, PlayerId, RoomId};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::arena::BotArena;
use crate::policy::{ClaimPolicy, policy_for};
use crate::timing::{BotTiming, BotTimings};

struct BotEntry {
    room: RoomId,
    difficulty: Difficulty,
    generation: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct Roster {
    next_generation: u64,
    bots: HashMap<PlayerId, BotEntry>,
}

pub struct BotCoordinator {
    arena: Arc<dyn BotArena>,
    timings: BotTimings,
    seed: Option<u64>,
    next_id: AtomicU64,
    roster: Arc<Mutex<Roster>>,
    shutdown: CancellationToken,
}

impl BotCoordinator {
    pub fn new(arena: Arc<dyn BotArena>) -> Self {
        Self {
            arena,
            timings: BotTimings::default(),
            seed: None,
            next_id: AtomicU64::new(1),
            roster: Arc::new(Mutex::new(Roster::default())),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_timings(mut self, timings: BotTimings) -> Self {
        self.timings = timings.validated();
        self
    }

    /// Makes every bot's choices and delays reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// A fresh player id such as `bot-hard-3`.
    pub fn next_id(&self, difficulty: Difficulty) -> PlayerId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        PlayerId::new(format!("bot-{difficulty}-{n}"))
    }

    /// Starts a bot playing as `player` in `room`.
    ///
    /// The player must already be seated. Spawning an id that is already
    /// running replaces the old task.
    pub fn spawn(&self, room: RoomId, player: PlayerId, difficulty: Difficulty) {
        let token = self.shutdown.child_token();
        let mut roster = self.lock();
        roster.next_generation += 1;
        let generation = roster.next_generation;

        let seed = self.seed.map(|s| s.wrapping_add(generation));
        let task = BotTask {
            arena: Arc::clone(&self.arena),
            policy: policy_for(difficulty, seed),
            timing: self.timings.get(difficulty),
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            },
            room: room.clone(),
            player: player.clone(),
            generation,
            token: token.clone(),
            roster: Arc::clone(&self.roster),
        };

        let previous = roster.bots.insert(
            player.clone(),
            BotEntry {
                room: room.clone(),
                difficulty,
                generation,
                token,
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
            debug!(player_id = %player, "bot replaced");
        }
        tokio::spawn(task.run());
        info!(room_id = %room, player_id = %player, %difficulty, "bot started");
    }

    /// Picks an id and starts a bot with it.
    pub fn add(&self, room: RoomId, difficulty: Difficulty) -> PlayerId {
        let player = self.next_id(difficulty);
        self.spawn(room, player.clone(), difficulty);
        player
    }

    /// Stops one bot. Returns `false` if it was not running.
    pub fn remove(&self, player: &PlayerId) -> bool {
        match self.lock().bots.remove(player) {
            Some(entry) => {
                entry.token.cancel();
                debug!(room_id = %entry.room, player_id = %player, "bot stopped");
                true
            }
            None => false,
        }
    }

    /// Stops every bot in `room` and returns their ids.
    pub fn remove_room(&self, room: &RoomId) -> Vec<PlayerId> {
        let mut roster = self.lock();
        let ids: Vec<PlayerId> = roster
            .bots
            .iter()
            .filter(|(_, e)| &e.room == room)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            if let Some(entry) = roster.bots.remove(id) {
                entry.token.cancel();
            }
        }
        if !ids.is_empty() {
            debug!(room_id = %room, count = ids.len(), "room bots stopped");
        }
        ids
    }

    /// Running bots in `room` with their difficulty, sorted by id.
    pub fn bots_in(&self, room: &RoomId) -> Vec<(PlayerId, Difficulty)> {
        let mut bots: Vec<_> = self
            .lock()
            .bots
            .iter()
            .filter(|(_, e)| &e.room == room)
            .map(|(id, e)| (id.clone(), e.difficulty))
            .collect();
        bots.sort_by(|a, b| a.0.cmp(&b.0));
        bots
    }

    pub fn room_of(&self, player: &PlayerId) -> Option<RoomId> {
        self.lock().bots.get(player).map(|e| e.room.clone())
    }

    pub fn is_running(&self, player: &PlayerId) -> bool {
        self.lock().bots.contains_key(player)
    }

    pub fn count(&self) -> usize {
        self.lock().bots.len()
    }

    /// Stops every bot.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.lock().bots.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Roster> {
        self.roster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for BotCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ---------------------------------------------------------------------------
// Bot task
// ---------------------------------------------------------------------------

struct BotTask {
    arena: Arc<dyn BotArena>,
    policy: Box<dyn ClaimPolicy>,
    timing: BotTiming,
    rng: StdRng,
    room: RoomId,
    player: PlayerId,
    generation: u64,
    token: CancellationToken,
    roster: Arc<Mutex<Roster>>,
}

impl BotTask {
    async fn run(mut self) {
        loop {
            let delay = self.timing.sample(&mut self.rng);
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = time::sleep(delay) => {}
            }

            let Some((status, board)) = self.arena.board(&self.room).await else {
                debug!(room_id = %self.room, player_id = %self.player, "room gone, bot leaving");
                break;
            };
            if !status.is_active() {
                break;
            }
            let Some(triple) = self.policy.choose(&board) else {
                trace!(player_id = %self.player, "no set in view");
                continue;
            };
            if self.token.is_cancelled() {
                break;
            }

            let card_ids = triple.iter().map(|c| c.id()).collect();
            let result = self.arena.claim(&self.room, &self.player, card_ids).await;
            if result.success {
                debug!(
                    room_id = %self.room,
                    player_id = %self.player,
                    policy = self.policy.name(),
                    score = ?result.score,
                    "bot claim accepted"
                );
            } else {
                trace!(player_id = %self.player, error = ?result.error, "bot claim rejected");
            }
            if result.game_over.is_some() {
                break;
            }
        }
        self.deregister();
    }

    fn deregister(&self) {
        let mut roster = self
            .roster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if roster
            .bots
            .get(&self.player)
            .is_some_and(|e| e.generation == self.generation)
        {
            roster.bots.remove(&self.player);
        }
    }
}
