//! The session registry.
//!
//! Not thread-safe by itself; the service owns one behind an async mutex.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use setforge_protocol::{ConnectionId, PlayerId, RoomId};
use tokio::time::Instant;

use crate::{Identity, Session, SessionConfig, SessionError, SessionState};

/// ```text
/// create() ──→ disconnect() ──→ reconnect()
///                   │
///                   ▼ (grace elapsed)
///             expire_stale() ──→ cleanup_expired()
/// ```
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,

    /// Reconnect token → player. Kept in sync with `sessions`.
    tokens: HashMap<String, PlayerId>,

    /// Live connection → player. Only connected sessions appear here.
    connections: HashMap<ConnectionId, PlayerId>,

    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            connections: HashMap::new(),
            config: config.validated(),
        }
    }

    fn grace(&self) -> Duration {
        Duration::from_secs(self.config.reconnect_grace_secs)
    }

    /// Opens a session for a freshly authenticated player on `connection`.
    ///
    /// A disconnected or expired session for the same player is replaced;
    /// the room it remembered carries over.
    ///
    /// # Errors
    /// [`SessionError::AlreadyConnected`] if the player is connected
    /// elsewhere.
    pub fn create(
        &mut self,
        identity: Identity,
        connection: ConnectionId,
    ) -> Result<&Session, SessionError> {
        let mut room = None;
        if let Some(existing) = self.sessions.get(&identity.player_id) {
            if existing.is_connected() {
                return Err(SessionError::AlreadyConnected(identity.player_id));
            }
            self.tokens.remove(&existing.reconnect_token);
            room = existing.room.clone();
        }

        let token = generate_token();
        let player_id = identity.player_id.clone();
        let session = Session {
            player_id: player_id.clone(),
            display_name: identity.display_name,
            connection,
            state: SessionState::Connected,
            reconnect_token: token.clone(),
            room,
        };

        self.tokens.insert(token, player_id.clone());
        self.connections.insert(connection, player_id.clone());
        tracing::info!(player_id = %player_id, %connection, "session created");
        Ok(&*self.sessions.entry(player_id).insert_entry(session).into_mut())
    }

    /// Marks the player behind `connection` as disconnected and starts the
    /// grace period. Returns that player.
    ///
    /// # Errors
    /// [`SessionError::UnknownConnection`] if nothing is connected there.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Result<PlayerId, SessionError> {
        let player_id = self
            .connections
            .remove(&connection)
            .ok_or(SessionError::UnknownConnection(connection))?;
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or_else(|| SessionError::NotFound(player_id.clone()))?;

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };
        tracing::info!(player_id = %player_id, %connection, "player disconnected, grace period started");
        Ok(player_id)
    }

    /// Resumes a disconnected session on a new connection.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] if the token is unknown
    /// - [`SessionError::SessionExpired`] if the grace period elapsed
    /// - [`SessionError::AlreadyConnected`] if the session never dropped
    pub fn reconnect(
        &mut self,
        token: &str,
        connection: ConnectionId,
    ) -> Result<&Session, SessionError> {
        let grace = self.grace();
        let player_id = self
            .tokens
            .get(token)
            .cloned()
            .ok_or(SessionError::InvalidToken)?;
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::InvalidToken)?;

        match session.state {
            SessionState::Disconnected { since } => {
                if since.elapsed() >= grace {
                    session.state = SessionState::Expired;
                    return Err(SessionError::SessionExpired(player_id));
                }
                session.state = SessionState::Connected;
                session.connection = connection;
                self.connections.insert(connection, player_id.clone());
                tracing::info!(player_id = %player_id, %connection, "player reconnected");
                Ok(&*session)
            }
            SessionState::Connected => Err(SessionError::AlreadyConnected(player_id)),
            SessionState::Expired => Err(SessionError::SessionExpired(player_id)),
        }
    }

    /// Expires every disconnected session past its grace period and
    /// returns the affected players.
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let grace = self.grace();
        let mut expired = Vec::new();
        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = session.state {
                if since.elapsed() >= grace {
                    session.state = SessionState::Expired;
                    tracing::info!(player_id = %session.player_id, "session expired");
                    expired.push(session.player_id.clone());
                }
            }
        }
        expired.sort();
        expired
    }

    /// Drops expired sessions and their tokens.
    pub fn cleanup_expired(&mut self) {
        self.sessions.retain(|_, session| {
            if matches!(session.state, SessionState::Expired) {
                self.tokens.remove(&session.reconnect_token);
                false
            } else {
                true
            }
        });
    }

    /// Remembers which room the player is in. `None` when they leave.
    pub fn set_room(&mut self, player_id: &PlayerId, room: Option<RoomId>) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(player_id)
            .ok_or_else(|| SessionError::NotFound(player_id.clone()))?;
        session.room = room;
        Ok(())
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// The connected session on `connection`.
    pub fn by_connection(&self, connection: ConnectionId) -> Option<&Session> {
        self.connections
            .get(&connection)
            .and_then(|p| self.sessions.get(p))
    }

    /// Players whose session points at `room`, sorted.
    pub fn players_in(&self, room: &RoomId) -> Vec<PlayerId> {
        let mut players: Vec<_> = self
            .sessions
            .values()
            .filter(|s| s.room.as_ref() == Some(room))
            .map(|s| s.player_id.clone())
            .collect();
        players.sort();
        players
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// 32 hex characters, 128 bits of entropy.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(grace: u64) -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace_secs: grace,
        })
    }

    fn alice() -> Identity {
        Identity::new("alice", "Alice")
    }

    fn bob() -> Identity {
        Identity::new("bob", "Bob")
    }

    const C1: ConnectionId = ConnectionId(1);
    const C2: ConnectionId = ConnectionId(2);
    const C3: ConnectionId = ConnectionId(3);

    // =====================================================================
    // create()
    // =====================================================================

    #[test]
    fn test_create_new_player_returns_connected_session() {
        let mut mgr = manager(30);
        let session = mgr.create(alice(), C1).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.display_name, "Alice");
        assert_eq!(session.reconnect_token.len(), 32);
        assert_eq!(mgr.by_connection(C1).unwrap().player_id, PlayerId::new("alice"));
    }

    #[test]
    fn test_create_players_get_unique_tokens() {
        let mut mgr = manager(30);
        let t1 = mgr.create(alice(), C1).unwrap().reconnect_token.clone();
        let t2 = mgr.create(bob(), C2).unwrap().reconnect_token.clone();
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_create_already_connected_returns_error() {
        let mut mgr = manager(30);
        mgr.create(alice(), C1).unwrap();
        assert!(matches!(
            mgr.create(alice(), C2),
            Err(SessionError::AlreadyConnected(p)) if p.as_str() == "alice"
        ));
    }

    #[test]
    fn test_create_replaces_disconnected_session_and_keeps_room() {
        let mut mgr = manager(30);
        let old = mgr.create(alice(), C1).unwrap().reconnect_token.clone();
        mgr.set_room(&PlayerId::new("alice"), Some(RoomId::new("r1"))).unwrap();
        mgr.disconnect(C1).unwrap();

        let session = mgr.create(alice(), C2).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.room, Some(RoomId::new("r1")));
        assert!(matches!(mgr.reconnect(&old, C3), Err(SessionError::InvalidToken)));
    }

    // =====================================================================
    // disconnect() / reconnect()
    // =====================================================================

    #[test]
    fn test_disconnect_unknown_connection_returns_error() {
        let mut mgr = manager(30);
        assert!(matches!(
            mgr.disconnect(C1),
            Err(SessionError::UnknownConnection(c)) if c == C1
        ));
    }

    #[test]
    fn test_disconnect_frees_connection_and_keeps_token() {
        let mut mgr = manager(30);
        let token = mgr.create(alice(), C1).unwrap().reconnect_token.clone();
        let player = mgr.disconnect(C1).unwrap();
        assert_eq!(player.as_str(), "alice");
        assert!(mgr.by_connection(C1).is_none());
        assert_eq!(mgr.get(&player).unwrap().reconnect_token, token);
    }

    #[test]
    fn test_reconnect_valid_token_moves_to_new_connection() {
        let mut mgr = manager(30);
        let token = mgr.create(alice(), C1).unwrap().reconnect_token.clone();
        mgr.disconnect(C1).unwrap();

        let session = mgr.reconnect(&token, C2).unwrap();
        assert!(session.is_connected());
        assert_eq!(session.connection, C2);
        assert!(mgr.by_connection(C2).is_some());
    }

    #[test]
    fn test_reconnect_invalid_token_returns_error() {
        let mut mgr = manager(30);
        mgr.create(alice(), C1).unwrap();
        assert!(matches!(mgr.reconnect("nope", C2), Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_reconnect_already_connected_returns_error() {
        let mut mgr = manager(30);
        let token = mgr.create(alice(), C1).unwrap().reconnect_token.clone();
        assert!(matches!(
            mgr.reconnect(&token, C2),
            Err(SessionError::AlreadyConnected(_))
        ));
    }

    #[test]
    fn test_reconnect_with_zero_grace_is_refused() {
        let mut mgr = manager(0);
        let token = mgr.create(alice(), C1).unwrap().reconnect_token.clone();
        mgr.disconnect(C1).unwrap();
        assert!(matches!(
            mgr.reconnect(&token, C2),
            Err(SessionError::SessionExpired(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_grace_period_returns_expired() {
        let mut mgr = manager(10);
        let token = mgr.create(alice(), C1).unwrap().reconnect_token.clone();
        mgr.disconnect(C1).unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(matches!(
            mgr.reconnect(&token, C2),
            Err(SessionError::SessionExpired(_))
        ));
    }

    // =====================================================================
    // expire_stale() / cleanup_expired()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_expire_stale_only_touches_players_past_grace() {
        let mut mgr = manager(10);
        mgr.create(alice(), C1).unwrap();
        mgr.create(bob(), C2).unwrap();
        mgr.disconnect(C1).unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(mgr.expire_stale().is_empty());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(mgr.expire_stale(), vec![PlayerId::new("alice")]);
        assert!(mgr.get(&PlayerId::new("bob")).unwrap().is_connected());
    }

    #[test]
    fn test_cleanup_expired_removes_session_and_token() {
        let mut mgr = manager(0);
        let token = mgr.create(alice(), C1).unwrap().reconnect_token.clone();
        mgr.create(bob(), C2).unwrap();
        mgr.disconnect(C1).unwrap();
        mgr.expire_stale();

        mgr.cleanup_expired();

        assert_eq!(mgr.len(), 1);
        assert!(mgr.get(&PlayerId::new("alice")).is_none());
        assert!(matches!(mgr.reconnect(&token, C3), Err(SessionError::InvalidToken)));
    }

    // =====================================================================
    // rooms
    // =====================================================================

    #[test]
    fn test_players_in_follows_set_room() {
        let mut mgr = manager(30);
        mgr.create(bob(), C2).unwrap();
        mgr.create(alice(), C1).unwrap();
        let room = RoomId::new("r1");
        mgr.set_room(&PlayerId::new("bob"), Some(room.clone())).unwrap();
        mgr.set_room(&PlayerId::new("alice"), Some(room.clone())).unwrap();
        assert_eq!(
            mgr.players_in(&room),
            vec![PlayerId::new("alice"), PlayerId::new("bob")]
        );

        mgr.set_room(&PlayerId::new("bob"), None).unwrap();
        assert_eq!(mgr.players_in(&room), vec![PlayerId::new("alice")]);
        assert!(matches!(
            mgr.set_room(&PlayerId::new("carol"), None),
            Err(SessionError::NotFound(_))
        ));
    }
}
