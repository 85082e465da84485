//! The game engine: the only place a room's `GameState` is mutated.
//!
//! Every mutating operation takes the room's async mutex and runs
//! load → validate → mutate → persist inside it. Two claims on the same
//! room therefore never interleave, and whichever runs second sees the
//! first one's cards gone from the board. Rooms never share a lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use setforge_deck::{generate_deck, is_valid_triple, shuffle};
use setforge_protocol::{
    BotSeat, ClaimError, ClaimResult, FinishReason, GameOver, GameState, GameStatus, MatchId,
    MatchResult, MoveRecord, PlayerId, PlayerKind, RoomId, SnapshotRecord,
};
use setforge_store::{ResilientStore, StateStore};
use tokio::sync::Mutex;

use crate::board::{self, Repair};
use crate::directory::{InMemoryDirectory, MatchStatus, RoomDirectory};
use crate::finish::{standings, termination};
use crate::history::{HistoryWriter, InMemoryHistory};
use crate::{EngineError, GameSettings};

pub struct GameEngine {
    store: Arc<dyn StateStore>,
    history: Arc<dyn HistoryWriter>,
    directory: Arc<dyn RoomDirectory>,
    locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl GameEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        history: Arc<dyn HistoryWriter>,
        directory: Arc<dyn RoomDirectory>,
    ) -> Self {
        Self {
            store,
            history,
            directory,
            locks: DashMap::new(),
        }
    }

    /// An engine backed entirely by in-process collaborators.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(ResilientStore::memory_only()),
            Arc::new(InMemoryHistory::new()),
            Arc::new(InMemoryDirectory::new()),
        )
    }

    pub fn directory(&self) -> &Arc<dyn RoomDirectory> {
        &self.directory
    }

    pub fn history(&self) -> &Arc<dyn HistoryWriter> {
        &self.history
    }

    fn room_lock(&self, room: &RoomId) -> Arc<Mutex<()>> {
        self.locks.entry(room.clone()).or_default().clone()
    }

    /// Forgets the room's lock once nobody holds or awaits it.
    ///
    /// The count is checked under the map's shard lock, which `room_lock`
    /// also takes, so no clone can appear between check and removal.
    fn release_lock(&self, room: &RoomId) {
        self.locks
            .remove_if(room, |_, lock| Arc::strong_count(lock) == 1);
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Deals a fresh game for `players` and persists it as snapshot 0.
    ///
    /// Does not check for an existing game in the room; callers do.
    ///
    /// # Errors
    /// `EmptyRoster` / `DuplicatePlayer` for a bad roster, `Persist` if the
    /// state could not be stored.
    pub async fn create_game(
        &self,
        room: &RoomId,
        players: &[PlayerId],
        settings: &GameSettings,
    ) -> Result<GameState, EngineError> {
        if players.is_empty() {
            return Err(EngineError::EmptyRoster);
        }
        let mut seen = HashSet::new();
        for p in players {
            if !seen.insert(p) {
                return Err(EngineError::DuplicatePlayer(p.clone()));
            }
        }

        let lock = self.room_lock(room);
        let _guard = lock.lock().await;

        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let mut deck = shuffle(generate_deck(), &mut rng);
        let mut board = Vec::new();
        board::fill(&mut board, &mut deck);
        let playable = board::repair(&mut board, &mut deck) != Repair::Exhausted;

        let now = Utc::now();
        let match_id = self.begin_match(room, settings.countdown_secs, now).await;

        let mut state = GameState {
            room_id: room.clone(),
            match_id,
            status: GameStatus::Active,
            deck,
            board,
            scores: players.iter().map(|p| (p.clone(), 0)).collect(),
            players: players.to_vec(),
            bots: Vec::new(),
            created_at: now,
            updated_at: now,
            sequence_number: 0,
            last_snapshot: None,
            countdown_secs: settings.countdown_secs,
            finish_reason: None,
        };
        if !playable {
            state.status = GameStatus::Finished;
            state.finish_reason = Some(FinishReason::NoSetsRemain);
        }

        self.snapshot(&mut state).await;
        if !self.store.save(room, &state).await {
            return Err(EngineError::Persist(room.clone()));
        }

        tracing::info!(
            room_id = %room,
            match_id = ?state.match_id,
            players = state.players.len(),
            countdown_secs = ?state.countdown_secs,
            "game created"
        );
        Ok(state)
    }

    async fn begin_match(
        &self,
        room: &RoomId,
        countdown_secs: Option<u64>,
        started_at: DateTime<Utc>,
    ) -> Option<MatchId> {
        let registered = match self.directory.find_room(room).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => self.directory.create_room(Some(room.clone())).await.map(|_| ()),
            Err(e) => Err(e),
        };
        let result = match registered {
            Ok(()) => {
                self.directory
                    .begin_match(room, countdown_secs, started_at)
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(room_id = %room, error = %e, "could not record match, history disabled");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Claims
    // -----------------------------------------------------------------------

    /// Validates and applies a claim, stamped now.
    pub async fn submit_claim(
        &self,
        room: &RoomId,
        player: &PlayerId,
        card_ids: &[String],
    ) -> ClaimResult {
        self.submit_claim_at(room, player, card_ids, Utc::now()).await
    }

    /// Validates and applies a claim made at `claimed_at`.
    ///
    /// On success the move record, then the snapshot, then the state are
    /// persisted, in that order. History failures are logged and ignored.
    pub async fn submit_claim_at(
        &self,
        room: &RoomId,
        player: &PlayerId,
        card_ids: &[String],
        claimed_at: DateTime<Utc>,
    ) -> ClaimResult {
        let lock = self.room_lock(room);
        let _guard = lock.lock().await;

        let Some(mut state) = self.store.get(room).await else {
            return ClaimResult::rejected(ClaimError::GameNotFound);
        };
        if !state.status.is_active() {
            return ClaimResult::rejected(ClaimError::GameNotActive);
        }
        if card_ids.len() != 3 {
            return ClaimResult::rejected(ClaimError::InvalidClaimSize {
                got: card_ids.len(),
            });
        }

        let mut positions = [0usize; 3];
        for (slot, id) in positions.iter_mut().zip(card_ids) {
            match state.board_position(id) {
                Some(pos) => *slot = pos,
                None => {
                    tracing::debug!(room_id = %room, player_id = %player, card_id = %id, "card not on board");
                    return ClaimResult::rejected(ClaimError::CardNotOnBoard {
                        card_id: id.clone(),
                    });
                }
            }
        }
        let [i, j, k] = positions;
        if i == j || j == k || i == k {
            return ClaimResult::rejected(ClaimError::InvalidSet);
        }
        if !is_valid_triple(&state.board[i], &state.board[j], &state.board[k]) {
            return ClaimResult::rejected(ClaimError::InvalidSet);
        }

        // Accepted.
        if !state.has_player(player) {
            tracing::debug!(room_id = %room, player_id = %player, "claim from unseated player, seating");
            state.players.push(player.clone());
        }
        let claimed = [state.board[i].id(), state.board[j].id(), state.board[k].id()];
        board::replace(&mut state.board, &mut state.deck, &positions);
        let score = {
            let entry = state.scores.entry(player.clone()).or_insert(0);
            *entry += 1;
            *entry
        };
        state.sequence_number += 1;
        state.updated_at = Utc::now();

        let reason = termination(&state).or_else(|| {
            match board::repair(&mut state.board, &mut state.deck) {
                Repair::Exhausted => Some(FinishReason::NoSetsRemain),
                Repair::Swapped(n) => {
                    tracing::debug!(room_id = %room, swapped = n, "board repaired");
                    None
                }
                Repair::Playable => None,
            }
        });
        if let Some(reason) = reason {
            state.status = GameStatus::Finished;
            state.finish_reason = Some(reason);
        }

        if let Some(match_id) = state.match_id {
            let record = MoveRecord {
                match_id,
                player_id: player.clone(),
                card_ids: claimed,
                offset_ms: state.elapsed_ms(claimed_at),
                previous_snapshot: state.last_snapshot,
            };
            if let Err(e) = self.history.append_move(record).await {
                tracing::warn!(room_id = %room, error = %e, "move record not persisted");
            }
        }
        self.snapshot(&mut state).await;

        if !self.store.save(room, &state).await {
            tracing::error!(room_id = %room, sequence = state.sequence_number, "claimed state not persisted");
        }

        tracing::info!(
            room_id = %room,
            player_id = %player,
            sequence = state.sequence_number,
            score,
            deck = state.deck.len(),
            "claim accepted"
        );

        let game_over = match state.finish_reason {
            Some(reason) => Some(self.conclude(&state, reason).await),
            None => None,
        };
        ClaimResult::accepted(state.board, state.deck, score, state.sequence_number, game_over)
    }

    // -----------------------------------------------------------------------
    // Reads and recovery
    // -----------------------------------------------------------------------

    pub async fn get_state(&self, room: &RoomId) -> Option<GameState> {
        self.store.get(room).await
    }

    /// Returns the live state, or rebuilds one from durable history.
    ///
    /// A rebuilt state has the last snapshot's board and scores, an empty
    /// deck, and the directory's active participants as players.
    pub async fn recover_state(&self, room: &RoomId) -> Option<GameState> {
        let recovered = self.recover_locked(room).await;
        if recovered.is_none() {
            self.release_lock(room);
        }
        recovered
    }

    async fn recover_locked(&self, room: &RoomId) -> Option<GameState> {
        let lock = self.room_lock(room);
        let _guard = lock.lock().await;

        if let Some(state) = self.store.get(room).await {
            return Some(state);
        }

        let current = match self.directory.current_match(room).await {
            Ok(Some(m)) if m.status == MatchStatus::Running => m,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(room_id = %room, error = %e, "directory unavailable during recovery");
                return None;
            }
        };
        let (snapshot_id, snapshot) = match self.history.latest_snapshot(current.id).await {
            Ok(Some(found)) => found,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(room_id = %room, error = %e, "history unavailable during recovery");
                return None;
            }
        };
        if let Some(mark) = self.store.high_water(room) {
            if snapshot.sequence_number < mark {
                tracing::warn!(
                    room_id = %room,
                    sequence = snapshot.sequence_number,
                    high_water = mark,
                    "latest snapshot is older than acknowledged state, not recovering"
                );
                return None;
            }
        }

        let participants = match self.directory.active_participants(room).await {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(room_id = %room, error = %e, "participants unavailable, using snapshot scores");
                Vec::new()
            }
        };
        let (players, bots) = if participants.is_empty() {
            let mut players: Vec<PlayerId> = snapshot.scores.keys().cloned().collect();
            players.sort();
            (players, Vec::new())
        } else {
            let bots = participants
                .iter()
                .filter_map(|p| {
                    p.kind
                        .difficulty()
                        .map(|difficulty| BotSeat::new(p.player_id.clone(), difficulty))
                })
                .collect();
            let players = participants.into_iter().map(|p| p.player_id).collect();
            (players, bots)
        };
        let scores: HashMap<PlayerId, u32> = players
            .iter()
            .map(|p| (p.clone(), snapshot.scores.get(p).copied().unwrap_or(0)))
            .collect();

        let mut state = GameState {
            room_id: room.clone(),
            match_id: Some(current.id),
            status: GameStatus::Active,
            deck: Vec::new(),
            board: snapshot.board,
            scores,
            players,
            bots,
            created_at: current.started_at,
            updated_at: Utc::now(),
            sequence_number: snapshot.sequence_number,
            last_snapshot: Some(snapshot_id),
            countdown_secs: current.duration_secs,
            finish_reason: None,
        };
        if let Some(reason) = termination(&state) {
            state.status = GameStatus::Finished;
            state.finish_reason = Some(reason);
        }

        if !self.store.save(room, &state).await {
            tracing::error!(room_id = %room, "recovered state not persisted");
        }
        tracing::info!(
            room_id = %room,
            match_id = %current.id,
            sequence = state.sequence_number,
            board = state.board.len(),
            "state recovered from snapshot"
        );

        if let Some(reason) = state.finish_reason {
            self.conclude(&state, reason).await;
        }
        Some(state)
    }

    // -----------------------------------------------------------------------
    // Roster and lifecycle
    // -----------------------------------------------------------------------

    /// Seats a player in a running game with a zero score.
    ///
    /// Seating someone already seated is a no-op. Does not change
    /// `sequence_number`.
    pub async fn add_player(
        &self,
        room: &RoomId,
        player: &PlayerId,
        kind: PlayerKind,
    ) -> Result<GameState, EngineError> {
        let lock = self.room_lock(room);
        let _guard = lock.lock().await;

        let mut state = self
            .store
            .get(room)
            .await
            .ok_or_else(|| EngineError::NotFound(room.clone()))?;
        if state.status == GameStatus::Finished {
            return Err(EngineError::NotActive(room.clone()));
        }
        if state.has_player(player) {
            return Ok(state);
        }

        state.players.push(player.clone());
        state.scores.entry(player.clone()).or_insert(0);
        if let PlayerKind::Bot(difficulty) = kind {
            state.bots.push(BotSeat::new(player.clone(), difficulty));
        }
        state.updated_at = Utc::now();

        if !self.store.save(room, &state).await {
            return Err(EngineError::Persist(room.clone()));
        }
        tracing::info!(room_id = %room, player_id = %player, ?kind, "player seated");
        Ok(state)
    }

    /// Ends the game because its countdown ran out.
    ///
    /// Returns `None` if the room has no active game for `match_id`, which
    /// covers a game that already ended by claims.
    pub async fn expire(&self, room: &RoomId, match_id: Option<MatchId>) -> Option<GameOver> {
        let lock = self.room_lock(room);
        let _guard = lock.lock().await;

        let mut state = self.store.get(room).await?;
        if !state.status.is_active() || state.match_id != match_id {
            return None;
        }
        state.status = GameStatus::Finished;
        state.finish_reason = Some(FinishReason::TimeExpired);
        state.updated_at = Utc::now();

        if !self.store.save(room, &state).await {
            tracing::error!(room_id = %room, "expired state not persisted");
        }
        tracing::info!(room_id = %room, sequence = state.sequence_number, "game time expired");
        Some(self.conclude(&state, FinishReason::TimeExpired).await)
    }

    /// Removes the room's state from the fast store. History is kept.
    pub async fn close_room(&self, room: &RoomId) {
        {
            let lock = self.room_lock(room);
            let _guard = lock.lock().await;
            self.store.delete(room).await;
        }
        self.release_lock(room);
        tracing::debug!(room_id = %room, "room closed");
    }

    /// Takes a bot off the autonomous roster so nothing restarts it. It
    /// keeps its seat and score.
    ///
    /// # Errors
    /// `NotFound` if the room has no live state, `Persist` if the change
    /// could not be stored.
    pub async fn retire_bot(&self, room: &RoomId, player: &PlayerId) -> Result<GameState, EngineError> {
        let lock = self.room_lock(room);
        let _guard = lock.lock().await;

        let mut state = self
            .store
            .get(room)
            .await
            .ok_or_else(|| EngineError::NotFound(room.clone()))?;
        if !state.retire_bot(player) {
            return Ok(state);
        }
        state.updated_at = Utc::now();
        if !self.store.save(room, &state).await {
            return Err(EngineError::Persist(room.clone()));
        }
        tracing::info!(room_id = %room, player_id = %player, "bot retired");
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Appends a snapshot of the current board and remembers its id.
    async fn snapshot(&self, state: &mut GameState) {
        let Some(match_id) = state.match_id else {
            return;
        };
        let record = SnapshotRecord {
            match_id,
            sequence_number: state.sequence_number,
            board: state.board.clone(),
            scores: state.scores.clone(),
            deck_remaining: state.deck.len(),
            taken_at: state.updated_at,
        };
        match self.history.append_snapshot(record).await {
            Ok(id) => state.last_snapshot = Some(id),
            Err(e) => {
                tracing::warn!(room_id = %state.room_id, error = %e, "snapshot not persisted");
            }
        }
    }

    /// Final bookkeeping for a finished game: standings, results for
    /// human players, match marked finished.
    async fn conclude(&self, state: &GameState, reason: FinishReason) -> GameOver {
        let standings = standings(state);

        if let Some(match_id) = state.match_id {
            let duration_secs = (state.updated_at - state.created_at).num_seconds().max(0) as u64;
            let results: Vec<MatchResult> = standings
                .iter()
                .filter(|s| !state.is_bot(&s.player_id))
                .map(|s| MatchResult {
                    match_id,
                    player_id: s.player_id.clone(),
                    score: s.score,
                    rank: s.rank,
                    duration_secs,
                })
                .collect();
            if let Err(e) = self.directory.record_results(match_id, results).await {
                tracing::warn!(room_id = %state.room_id, error = %e, "results not recorded");
            }
            if let Err(e) = self.directory.finish_match(match_id).await {
                tracing::warn!(room_id = %state.room_id, error = %e, "match not marked finished");
            }
        }

        tracing::info!(room_id = %state.room_id, ?reason, "game finished");
        GameOver { reason, standings }
    }
}
