//! `GameService`: the engine, countdowns, bots and sessions wired together.
//!
//! The service owns one of each coordinator and routes between them:
//!
//! ```text
//! connection ──claim──→ GameService ──→ GameEngine ──→ store / history
//!                         ↑    │
//!      countdown pump ────┘    └──broadcast──→ RoomHub ──→ connections
//!      bot tasks ─────────┘
//! ```
//!
//! Bots and the countdown pump hold only a `Weak` reference back into the
//! service, so dropping the service stops everything.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use setforge_bots::{BotArena, BotCoordinator};
use setforge_engine::{
    GameEngine, GameSettings, InMemoryDirectory, InMemoryHistory, RoomDirectory, RoomRecord,
};
use setforge_protocol::{
    Card, ClaimError, ClaimResult, ConnectionId, Difficulty, GameOver, GameState, GameStatus,
    MatchId, PlayerId, PlayerKind, Recipient, RoomId, ServerEvent,
};
use setforge_session::{Authenticator, Broadcaster, RoomHub, SessionError, SessionManager};
use setforge_store::{RedisStore, ResilientStore};
use setforge_tick::{CountdownCoordinator, CountdownEvent};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{ServiceConfig, ServiceError};

/// How a client names the room it wants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRef {
    Id(RoomId),
    /// The six-character code players share.
    Code(String),
}

/// A freshly opened connection.
#[derive(Debug)]
pub struct Connected {
    pub connection: ConnectionId,
    pub player_id: PlayerId,
    pub reconnect_token: String,
    /// Everything the service sends to this connection.
    pub events: mpsc::UnboundedReceiver<ServerEvent>,
}

pub struct GameService<A: Authenticator> {
    inner: Arc<Inner<A>>,
    pump: JoinHandle<()>,
}

struct Inner<A: Authenticator> {
    engine: GameEngine,
    countdowns: CountdownCoordinator,
    bots: BotCoordinator,
    sessions: Mutex<SessionManager>,
    hub: RoomHub,
    auth: A,
    config: ServiceConfig,
    /// Settings for rooms opened but not yet played in.
    pending: DashMap<RoomId, GameSettings>,
    /// Serializes joins per room so two first joiners start one game.
    admissions: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl<A: Authenticator> GameService<A> {
    /// Builds a service with in-process directory and history, and a
    /// Redis-backed fast store when `config.redis_url` is set.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    /// [`ServiceError::Store`] if the Redis URL is malformed. An
    /// unreachable Redis is not an error; the store degrades.
    pub fn new(config: ServiceConfig, auth: A) -> Result<Self, ServiceError> {
        let config = config.validated();
        let store = match &config.redis_url {
            Some(url) => {
                let redis = RedisStore::open(url, config.store.clone())?;
                info!(url = %url, "fast store: redis with in-process fallback");
                ResilientStore::new(Arc::new(redis), config.store.clone())
            }
            None => {
                info!("fast store: in-process only");
                ResilientStore::memory_only()
            }
        };
        let engine = GameEngine::new(
            Arc::new(store),
            Arc::new(InMemoryHistory::new()),
            Arc::new(InMemoryDirectory::new()),
        );
        Ok(Self::with_engine(config, auth, engine))
    }

    /// Builds a service around an existing engine.
    pub fn with_engine(config: ServiceConfig, auth: A, engine: GameEngine) -> Self {
        let config = config.validated();
        let (countdowns, ticks) = CountdownCoordinator::new(config.countdown.clone());
        let timings = config.bots;
        let sessions = SessionManager::new(config.session.clone());

        let inner = Arc::new_cyclic(|weak: &Weak<Inner<A>>| Inner {
            engine,
            countdowns,
            bots: BotCoordinator::new(Arc::new(ServiceArena(weak.clone()))).with_timings(timings),
            sessions: Mutex::new(sessions),
            hub: RoomHub::new(),
            auth,
            config,
            pending: DashMap::new(),
            admissions: DashMap::new(),
        });
        let pump = tokio::spawn(pump(Arc::downgrade(&inner), ticks));
        Self { inner, pump }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.inner.engine
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    // -----------------------------------------------------------------------
    // Game operations
    // -----------------------------------------------------------------------

    /// Deals a new game, seats `settings.bots`, and starts the countdown.
    ///
    /// Every listed player is recorded as a human participant.
    pub async fn create_game(
        &self,
        room: &RoomId,
        players: &[PlayerId],
        settings: &GameSettings,
    ) -> Result<GameState, ServiceError> {
        let directory = self.inner.engine.directory();
        if directory.find_room(room).await?.is_none() {
            ensure_room(directory.as_ref(), room).await?;
        }
        for player in players {
            if let Err(e) = directory
                .add_participant(room, player, player.as_str(), PlayerKind::Human)
                .await
            {
                warn!(room_id = %room, player_id = %player, error = %e, "participant not recorded");
            }
        }
        self.inner.start_game(room, players, settings).await
    }

    /// Validates and applies a claim, broadcasting the outcome to the room
    /// when it is accepted.
    pub async fn submit_claim(
        &self,
        room: &RoomId,
        player: &PlayerId,
        card_ids: &[String],
    ) -> ClaimResult {
        self.inner.submit_claim(room, player, card_ids, Utc::now()).await
    }

    /// [`submit_claim`](Self::submit_claim) with the claim stamped at
    /// `claimed_at` instead of now. The stamp sets the move's offset in the
    /// match history.
    pub async fn submit_claim_at(
        &self,
        room: &RoomId,
        player: &PlayerId,
        card_ids: &[String],
        claimed_at: DateTime<Utc>,
    ) -> ClaimResult {
        self.inner.submit_claim(room, player, card_ids, claimed_at).await
    }

    pub async fn get_state(&self, room: &RoomId) -> Option<GameState> {
        self.inner.engine.get_state(room).await
    }

    /// Live state, or one rebuilt from history. A recovered game picks up
    /// its countdown from the match's original start and its bots resume.
    pub async fn recover_state(&self, room: &RoomId) -> Option<GameState> {
        self.inner.recover_state(room).await
    }

    pub fn start_countdown(&self, room: &RoomId, match_id: Option<MatchId>, secs: u64) {
        self.inner.countdowns.start(room.clone(), match_id, secs);
    }

    pub fn resume_countdown(
        &self,
        room: &RoomId,
        match_id: Option<MatchId>,
        secs: u64,
        started_at: DateTime<Utc>,
    ) {
        self.inner
            .countdowns
            .resume(room.clone(), match_id, secs, started_at);
    }

    pub fn stop_countdown(&self, room: &RoomId) {
        self.inner.countdowns.stop(room);
    }

    pub fn remaining_time(&self, room: &RoomId) -> Option<u64> {
        self.inner.countdowns.remaining_time(room)
    }

    /// Seats a new bot in the room's running game and starts it.
    pub async fn add_autonomous_player(
        &self,
        room: &RoomId,
        difficulty: Difficulty,
    ) -> Result<PlayerId, ServiceError> {
        self.inner.add_bot(room, difficulty).await
    }

    /// Stops a bot for good. It keeps its seat and score but is no longer
    /// restarted when the room resumes. Returns `false` if no such bot is
    /// running.
    pub async fn remove_autonomous_player(&self, player: &PlayerId) -> bool {
        let Some(room) = self.inner.bots.room_of(player) else {
            return false;
        };
        if !self.inner.bots.remove(player) {
            return false;
        }
        if let Err(e) = self.inner.engine.retire_bot(&room, player).await {
            warn!(room_id = %room, player_id = %player, error = %e, "bot not retired");
        }
        if let Err(e) = self
            .inner
            .engine
            .directory()
            .remove_participant(&room, player)
            .await
        {
            warn!(room_id = %room, player_id = %player, error = %e, "participant not removed");
        }
        self.inner.hub.to_room(
            &room,
            &ServerEvent::PlayerLeft {
                room_id: room.clone(),
                player_id: player.clone(),
            },
        );
        true
    }

    /// Running bots in `room`.
    pub fn bots_in(&self, room: &RoomId) -> Vec<(PlayerId, Difficulty)> {
        self.inner.bots.bots_in(room)
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Authenticates `token` and opens a connection for it.
    pub async fn connect(&self, token: &str) -> Result<Connected, ServiceError> {
        let identity = self.inner.auth.authenticate(token).await?;
        let player_id = identity.player_id.clone();
        let (connection, events) = self.inner.hub.open(player_id.clone());

        let created = {
            let mut sessions = self.inner.sessions.lock().await;
            sessions
                .create(identity, connection)
                .map(|s| s.reconnect_token.clone())
        };
        let reconnect_token = match created {
            Ok(token) => token,
            Err(e) => {
                self.inner.hub.close(connection);
                return Err(e.into());
            }
        };
        info!(player_id = %player_id, %connection, "connected");
        Ok(Connected {
            connection,
            player_id,
            reconnect_token,
            events,
        })
    }

    /// Resumes a dropped session on a new connection and puts the player
    /// back in their room, sending them its current state.
    pub async fn reconnect(&self, reconnect_token: &str) -> Result<Connected, ServiceError> {
        let (connection, events) = self.inner.hub.open(PlayerId::new(""));
        let resumed = {
            let mut sessions = self.inner.sessions.lock().await;
            sessions
                .reconnect(reconnect_token, connection)
                .map(|s| (s.player_id.clone(), s.room.clone()))
        };
        let (player_id, room) = match resumed {
            Ok(found) => found,
            Err(e) => {
                self.inner.hub.close(connection);
                return Err(e.into());
            }
        };
        self.inner.hub.rebind(connection, player_id.clone());

        if let Some(room) = room {
            self.inner.hub.join(connection, room.clone());
            if let Some(state) = self.inner.recover_state(&room).await {
                self.inner
                    .hub
                    .to_connection(connection, &ServerEvent::GameState { state });
            }
        }
        Ok(Connected {
            connection,
            player_id,
            reconnect_token: reconnect_token.to_string(),
            events,
        })
    }

    /// Drops a connection. The player keeps their seat for the grace period.
    pub async fn disconnect(&self, connection: ConnectionId) -> Result<PlayerId, ServiceError> {
        let player = self.inner.sessions.lock().await.disconnect(connection)?;
        self.inner.hub.close(connection);
        Ok(player)
    }

    /// Expires sessions past their grace period and takes those players out
    /// of their rooms. Returns the expired players.
    pub async fn sweep_sessions(&self) -> Vec<PlayerId> {
        let expired: Vec<(PlayerId, Option<RoomId>)> = {
            let mut sessions = self.inner.sessions.lock().await;
            let ids = sessions.expire_stale();
            let out = ids
                .into_iter()
                .map(|p| {
                    let room = sessions.get(&p).and_then(|s| s.room.clone());
                    (p, room)
                })
                .collect();
            sessions.cleanup_expired();
            out
        };
        for (player, room) in &expired {
            if let Some(room) = room {
                self.inner.depart(room, player).await;
            }
        }
        expired.into_iter().map(|(p, _)| p).collect()
    }

    /// Registers a new room with a shareable code. The game starts when the
    /// first player joins.
    pub async fn open_room(&self, settings: GameSettings) -> Result<RoomRecord, ServiceError> {
        let record = self.inner.engine.directory().create_room(None).await?;
        self.inner
            .pending
            .insert(record.id.clone(), settings.validated());
        info!(room_id = %record.id, code = %record.code, "room opened");
        Ok(record)
    }

    /// Puts the connection's player in a room.
    ///
    /// Joins the running game if there is one, recovers it from history if
    /// it was lost, and otherwise starts a new one. A room named by id that
    /// does not exist yet is created.
    pub async fn join_room(
        &self,
        connection: ConnectionId,
        room: RoomRef,
    ) -> Result<GameState, ServiceError> {
        let (player, display_name) = self.inner.identity_of(connection).await?;
        let room = self.inner.resolve(room).await?;

        if let Some(previous) = self.inner.hub.room_of(connection) {
            if previous != room {
                self.leave_room(connection).await?;
            }
        }

        let admitted = {
            let gate = self.inner.admissions.entry(room.clone()).or_default().clone();
            let _admitted = gate.lock().await;

            if let Err(e) = self
                .inner
                .engine
                .directory()
                .add_participant(&room, &player, &display_name, PlayerKind::Human)
                .await
            {
                warn!(room_id = %room, player_id = %player, error = %e, "participant not recorded");
            }

            match self.inner.recover_state(&room).await {
                Some(state) if state.status.is_active() => {
                    if state.has_player(&player) {
                        Ok(state)
                    } else {
                        self.inner
                            .engine
                            .add_player(&room, &player, PlayerKind::Human)
                            .await
                            .map_err(ServiceError::from)
                    }
                }
                _ => {
                    let settings = self
                        .inner
                        .pending
                        .remove(&room)
                        .map(|(_, s)| s)
                        .unwrap_or_else(|| self.inner.config.default_settings());
                    self.inner
                        .start_game(&room, std::slice::from_ref(&player), &settings)
                        .await
                }
            }
        };
        self.inner.release_admission(&room);
        let state = admitted?;

        self.inner.hub.join(connection, room.clone());
        self.inner
            .sessions
            .lock()
            .await
            .set_room(&player, Some(room.clone()))?;
        self.inner.hub.dispatch(
            &room,
            &Recipient::AllExcept(player.clone()),
            &ServerEvent::PlayerJoined {
                room_id: room.clone(),
                player_id: player.clone(),
                display_name,
            },
        );
        self.inner.hub.to_connection(
            connection,
            &ServerEvent::GameState {
                state: state.clone(),
            },
        );
        info!(room_id = %room, player_id = %player, "player joined room");
        Ok(state)
    }

    /// Takes the connection's player out of their room. The last human to
    /// leave idles the room: its countdown and bots stop until someone
    /// joins again.
    pub async fn leave_room(&self, connection: ConnectionId) -> Result<(), ServiceError> {
        let (player, _) = self.inner.identity_of(connection).await?;
        let room = self
            .inner
            .hub
            .leave(connection)
            .ok_or(ServiceError::NotInRoom(connection))?;
        self.inner.sessions.lock().await.set_room(&player, None)?;
        self.inner.depart(&room, &player).await;
        Ok(())
    }

    /// A claim from a connection, in its current room. A rejection is sent
    /// back to that connection only.
    pub async fn claim(
        &self,
        connection: ConnectionId,
        card_ids: Vec<String>,
    ) -> Result<ClaimResult, ServiceError> {
        let (player, _) = self.inner.identity_of(connection).await?;
        let room = self
            .inner
            .hub
            .room_of(connection)
            .ok_or(ServiceError::NotInRoom(connection))?;

        let result = self
            .inner
            .submit_claim(&room, &player, &card_ids, Utc::now())
            .await;
        if !result.success {
            self.inner.hub.to_connection(
                connection,
                &ServerEvent::Claim {
                    room_id: room,
                    player_id: player,
                    card_ids,
                    result: result.clone(),
                },
            );
        }
        Ok(result)
    }

    /// Sends an [`Error`](ServerEvent::Error) event for `err` to a connection.
    pub fn report(&self, connection: ConnectionId, err: &ServiceError) {
        self.inner.hub.to_connection(
            connection,
            &ServerEvent::Error {
                code: err.code(),
                message: err.to_string(),
            },
        );
    }
}

impl<A: Authenticator> Drop for GameService<A> {
    fn drop(&mut self) {
        self.pump.abort();
        self.inner.bots.shutdown();
        self.inner.countdowns.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Inner
// ---------------------------------------------------------------------------

impl<A: Authenticator> Inner<A> {
    async fn identity_of(&self, connection: ConnectionId) -> Result<(PlayerId, String), ServiceError> {
        let sessions = self.sessions.lock().await;
        let session = sessions
            .by_connection(connection)
            .ok_or(SessionError::UnknownConnection(connection))?;
        Ok((session.player_id.clone(), session.display_name.clone()))
    }

    async fn resolve(&self, room: RoomRef) -> Result<RoomId, ServiceError> {
        let directory = self.engine.directory();
        match room {
            RoomRef::Id(id) => {
                if directory.find_room(&id).await?.is_none() {
                    ensure_room(directory.as_ref(), &id).await?;
                }
                Ok(id)
            }
            RoomRef::Code(code) => directory
                .find_by_code(&code)
                .await?
                .map(|r| r.id)
                .ok_or(ServiceError::UnknownRoomCode(code)),
        }
    }

    async fn start_game(
        &self,
        room: &RoomId,
        players: &[PlayerId],
        settings: &GameSettings,
    ) -> Result<GameState, ServiceError> {
        let settings = settings.clone().validated();
        let state = self.engine.create_game(room, players, &settings).await?;
        if !state.status.is_active() {
            return Ok(state);
        }

        if let Some(secs) = state.countdown_secs {
            self.countdowns
                .resume(room.clone(), state.match_id, secs, state.created_at);
        }
        for difficulty in &settings.bots {
            self.add_bot(room, *difficulty).await?;
        }
        Ok(self.engine.get_state(room).await.unwrap_or(state))
    }

    async fn add_bot(&self, room: &RoomId, difficulty: Difficulty) -> Result<PlayerId, ServiceError> {
        let player = self.bots.next_id(difficulty);
        self.engine
            .add_player(room, &player, PlayerKind::Bot(difficulty))
            .await?;

        let display_name = format!("Bot ({difficulty})");
        if let Err(e) = self
            .engine
            .directory()
            .add_participant(room, &player, &display_name, PlayerKind::Bot(difficulty))
            .await
        {
            warn!(room_id = %room, player_id = %player, error = %e, "bot participant not recorded");
        }
        self.bots.spawn(room.clone(), player.clone(), difficulty);
        self.hub.to_room(
            room,
            &ServerEvent::PlayerJoined {
                room_id: room.clone(),
                player_id: player.clone(),
                display_name,
            },
        );
        Ok(player)
    }

    async fn submit_claim(
        &self,
        room: &RoomId,
        player: &PlayerId,
        card_ids: &[String],
        claimed_at: DateTime<Utc>,
    ) -> ClaimResult {
        let result = self
            .engine
            .submit_claim_at(room, player, card_ids, claimed_at)
            .await;
        if !result.success {
            return result;
        }

        self.hub.to_room(
            room,
            &ServerEvent::Claim {
                room_id: room.clone(),
                player_id: player.clone(),
                card_ids: card_ids.to_vec(),
                result: result.clone(),
            },
        );
        if let Some(state) = self.engine.get_state(room).await {
            self.hub.to_room(room, &ServerEvent::GameState { state });
        }
        if let Some(over) = result.game_over.clone() {
            self.conclude(room, over).await;
        }
        result
    }

    async fn recover_state(&self, room: &RoomId) -> Option<GameState> {
        let state = self.engine.recover_state(room).await?;
        if state.status.is_active() {
            self.resume_room(&state);
        } else {
            self.countdowns.stop(room);
            self.bots.remove_room(room);
            self.engine.close_room(room).await;
        }
        Some(state)
    }

    /// Forgets `room`'s admission gate unless a join still holds it.
    fn release_admission(&self, room: &RoomId) {
        self.admissions
            .remove_if(room, |_, gate| Arc::strong_count(gate) == 1);
    }

    /// Restarts whatever a live game needs and is not running: its
    /// countdown, measured from the original start, and its bots.
    fn resume_room(&self, state: &GameState) {
        let room = &state.room_id;
        if let Some(secs) = state.countdown_secs {
            if !self.countdowns.is_running(room) {
                self.countdowns
                    .resume(room.clone(), state.match_id, secs, state.created_at);
            }
        }
        for seat in state.active_bots() {
            if !self.bots.is_running(&seat.player_id) {
                self.bots
                    .spawn(room.clone(), seat.player_id.clone(), seat.difficulty);
            }
        }
    }

    /// A player left `room` for good.
    async fn depart(&self, room: &RoomId, player: &PlayerId) {
        let directory = self.engine.directory();
        if let Err(e) = directory.remove_participant(room, player).await {
            warn!(room_id = %room, player_id = %player, error = %e, "participant not removed");
        }
        self.hub.to_room(
            room,
            &ServerEvent::PlayerLeft {
                room_id: room.clone(),
                player_id: player.clone(),
            },
        );

        let humans_left = match directory.active_participants(room).await {
            Ok(list) => list.iter().any(|p| p.kind == PlayerKind::Human),
            Err(_) => true,
        };
        if !humans_left {
            self.countdowns.stop(room);
            let bots = self.bots.remove_room(room);
            info!(room_id = %room, bots = bots.len(), "room idle");
        }
    }

    async fn on_expired(&self, room: &RoomId, match_id: Option<MatchId>) {
        match self.engine.expire(room, match_id).await {
            Some(over) => self.conclude(room, over).await,
            None => debug!(room_id = %room, "countdown expired for a game that already ended"),
        }
    }

    /// Tears a finished game down and tells the room how it ended.
    async fn conclude(&self, room: &RoomId, over: GameOver) {
        self.countdowns.stop(room);
        let bots = self.bots.remove_room(room);
        self.hub.to_room(
            room,
            &ServerEvent::GameOver {
                room_id: room.clone(),
                summary: over,
            },
        );
        self.engine.close_room(room).await;
        self.release_admission(room);
        info!(room_id = %room, bots = bots.len(), "game concluded");
    }
}

/// Registers `room` in the directory, tolerating a concurrent registration.
async fn ensure_room(directory: &dyn RoomDirectory, room: &RoomId) -> Result<(), ServiceError> {
    match directory.create_room(Some(room.clone())).await {
        Ok(_) | Err(setforge_engine::DirectoryError::RoomExists(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Countdown pump
// ---------------------------------------------------------------------------

async fn pump<A: Authenticator>(
    inner: Weak<Inner<A>>,
    mut ticks: mpsc::UnboundedReceiver<CountdownEvent>,
) {
    while let Some(event) = ticks.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        match event {
            CountdownEvent::Tick {
                room,
                remaining_secs,
                ..
            } => {
                inner.hub.to_room(
                    &room,
                    &ServerEvent::Timer {
                        room_id: room.clone(),
                        remaining_secs,
                    },
                );
            }
            CountdownEvent::Expired { room, match_id } => {
                // Each expiry runs on its own task so one room's failure
                // cannot stall the others.
                let failed_room = room.clone();
                let handler = tokio::spawn(async move { inner.on_expired(&room, match_id).await });
                tokio::spawn(async move {
                    if let Err(e) = handler.await {
                        error!(room_id = %failed_room, error = %e, "countdown expiry handler failed");
                    }
                });
            }
        }
    }
    debug!("countdown pump stopped");
}

// ---------------------------------------------------------------------------
// Bot arena
// ---------------------------------------------------------------------------

/// Gives bots the same claim path as connections.
struct ServiceArena<A: Authenticator>(Weak<Inner<A>>);

#[async_trait]
impl<A: Authenticator> BotArena for ServiceArena<A> {
    async fn board(&self, room: &RoomId) -> Option<(GameStatus, Vec<Card>)> {
        let inner = self.0.upgrade()?;
        inner
            .engine
            .get_state(room)
            .await
            .map(|s| (s.status, s.board))
    }

    async fn claim(&self, room: &RoomId, player: &PlayerId, card_ids: Vec<String>) -> ClaimResult {
        match self.0.upgrade() {
            Some(inner) => inner.submit_claim(room, player, &card_ids, Utc::now()).await,
            None => ClaimResult::rejected(ClaimError::GameNotFound),
        }
    }
}


#[cfg(test)]
mod tests {
    use setforge_session::TrustingAuthenticator;

    use super::*;

    fn service() -> GameService<TrustingAuthenticator> {
        let config = ServiceConfig {
            default_countdown_secs: None,
            ..ServiceConfig::default()
        };
        GameService::new(config, TrustingAuthenticator).unwrap()
    }

    #[tokio::test]
    async fn test_join_room_forgets_admission_gate() {
        let service = service();
        let alice = service.connect("alice").await.unwrap();
        let bob = service.connect("bob").await.unwrap();
        let room = RoomId::new("r1");

        service
            .join_room(alice.connection, RoomRef::Id(room.clone()))
            .await
            .unwrap();
        assert!(service.inner.admissions.is_empty());

        service
            .join_room(bob.connection, RoomRef::Id(room.clone()))
            .await
            .unwrap();
        service.leave_room(alice.connection).await.unwrap();
        assert!(service.inner.admissions.is_empty());
    }

    #[tokio::test]
    async fn test_release_admission_keeps_gate_held_by_a_join() {
        let service = service();
        let room = RoomId::new("r1");
        let held = service
            .inner
            .admissions
            .entry(room.clone())
            .or_default()
            .clone();

        service.inner.release_admission(&room);
        assert!(service.inner.admissions.contains_key(&room));

        drop(held);
        service.inner.release_admission(&room);
        assert!(service.inner.admissions.is_empty());
    }

    #[tokio::test]
    async fn test_concluded_game_forgets_admission_gate() {
        let service = service();
        let alice = service.connect("alice").await.unwrap();
        let room = RoomId::new("r1");
        let state = service
            .join_room(alice.connection, RoomRef::Id(room.clone()))
            .await
            .unwrap();
        let gate = service.inner.admissions.entry(room.clone()).or_default().clone();
        drop(gate);

        service.inner.on_expired(&room, state.match_id).await;

        assert!(service.get_state(&room).await.is_none());
        assert!(service.inner.admissions.is_empty());
    }
}
