//! Durable room / match / participant directory.
//!
//! The engine reads it for recovery (current match, active participants)
//! and writes to it when a match begins and finishes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use setforge_protocol::{MatchId, MatchResult, PlayerId, PlayerKind, RoomId};
use tokio::sync::Mutex;

/// Characters used in room codes. No 0/O, 1/I/L.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const CODE_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("room {0} already exists")]
    RoomExists(RoomId),

    #[error("match {0} not found")]
    MatchNotFound(MatchId),

    #[error("results for match {0} were already recorded")]
    ResultsAlreadyRecorded(MatchId),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: RoomId,
    /// Short human-friendly join code.
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub current_match: Option<MatchId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Running,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub room: RoomId,
    /// Countdown length, if the match is timed.
    pub duration_secs: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub player_id: PlayerId,
    pub display_name: String,
    pub kind: PlayerKind,
    pub active: bool,
}

#[async_trait]
pub trait RoomDirectory: Send + Sync + 'static {
    /// Registers a room. With `None`, an id is generated.
    async fn create_room(&self, room: Option<RoomId>) -> Result<RoomRecord, DirectoryError>;

    async fn find_room(&self, room: &RoomId) -> Result<Option<RoomRecord>, DirectoryError>;

    /// Case-insensitive lookup by join code.
    async fn find_by_code(&self, code: &str) -> Result<Option<RoomRecord>, DirectoryError>;

    /// Records a new match and makes it the room's current one.
    async fn begin_match(
        &self,
        room: &RoomId,
        duration_secs: Option<u64>,
        started_at: DateTime<Utc>,
    ) -> Result<MatchId, DirectoryError>;

    async fn current_match(&self, room: &RoomId) -> Result<Option<MatchRecord>, DirectoryError>;

    /// Marks the match finished. Returns `false` if it already was.
    async fn finish_match(&self, match_id: MatchId) -> Result<bool, DirectoryError>;

    /// Adds a participant, or reactivates one that left.
    async fn add_participant(
        &self,
        room: &RoomId,
        player: &PlayerId,
        display_name: &str,
        kind: PlayerKind,
    ) -> Result<(), DirectoryError>;

    async fn remove_participant(&self, room: &RoomId, player: &PlayerId)
    -> Result<(), DirectoryError>;

    /// Active participants in join order.
    async fn active_participants(&self, room: &RoomId) -> Result<Vec<Participant>, DirectoryError>;

    /// Writes the final results of a match. Only once per match.
    async fn record_results(
        &self,
        match_id: MatchId,
        results: Vec<MatchResult>,
    ) -> Result<(), DirectoryError>;
}

/// Generates a random join code from [`CODE_ALPHABET`].
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

// ---------------------------------------------------------------------------
// InMemoryDirectory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    next_room: u64,
    next_match: u64,
    rooms: HashMap<RoomId, RoomRecord>,
    matches: HashMap<MatchId, MatchRecord>,
    participants: HashMap<RoomId, Vec<Participant>>,
    results: HashMap<MatchId, Vec<MatchResult>>,
}

#[derive(Default)]
pub struct InMemoryDirectory {
    tables: Mutex<Tables>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn results(&self, match_id: MatchId) -> Vec<MatchResult> {
        let tables = self.tables.lock().await;
        tables.results.get(&match_id).cloned().unwrap_or_default()
    }

    pub async fn match_record(&self, match_id: MatchId) -> Option<MatchRecord> {
        let tables = self.tables.lock().await;
        tables.matches.get(&match_id).cloned()
    }
}

#[async_trait]
impl RoomDirectory for InMemoryDirectory {
    async fn create_room(&self, room: Option<RoomId>) -> Result<RoomRecord, DirectoryError> {
        let mut tables = self.tables.lock().await;
        let id = match room {
            Some(id) if tables.rooms.contains_key(&id) => {
                return Err(DirectoryError::RoomExists(id));
            }
            Some(id) => id,
            None => loop {
                tables.next_room += 1;
                let candidate = RoomId::new(format!("room-{}", tables.next_room));
                if !tables.rooms.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        let code = {
            let mut rng = rand::rng();
            loop {
                let code = generate_code(&mut rng);
                if !tables.rooms.values().any(|r| r.code == code) {
                    break code;
                }
            }
        };

        let record = RoomRecord {
            id: id.clone(),
            code,
            created_at: Utc::now(),
            current_match: None,
        };
        tables.rooms.insert(id, record.clone());
        Ok(record)
    }

    async fn find_room(&self, room: &RoomId) -> Result<Option<RoomRecord>, DirectoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.rooms.get(room).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<RoomRecord>, DirectoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rooms
            .values()
            .find(|r| r.code.eq_ignore_ascii_case(code.trim()))
            .cloned())
    }

    async fn begin_match(
        &self,
        room: &RoomId,
        duration_secs: Option<u64>,
        started_at: DateTime<Utc>,
    ) -> Result<MatchId, DirectoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.rooms.contains_key(room) {
            return Err(DirectoryError::RoomNotFound(room.clone()));
        }
        tables.next_match += 1;
        let id = MatchId(tables.next_match);
        tables.matches.insert(
            id,
            MatchRecord {
                id,
                room: room.clone(),
                duration_secs,
                started_at,
                status: MatchStatus::Running,
            },
        );
        if let Some(record) = tables.rooms.get_mut(room) {
            record.current_match = Some(id);
        }
        Ok(id)
    }

    async fn current_match(&self, room: &RoomId) -> Result<Option<MatchRecord>, DirectoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .rooms
            .get(room)
            .and_then(|r| r.current_match)
            .and_then(|id| tables.matches.get(&id))
            .cloned())
    }

    async fn finish_match(&self, match_id: MatchId) -> Result<bool, DirectoryError> {
        let mut tables = self.tables.lock().await;
        let record = tables
            .matches
            .get_mut(&match_id)
            .ok_or(DirectoryError::MatchNotFound(match_id))?;
        if record.status == MatchStatus::Finished {
            return Ok(false);
        }
        record.status = MatchStatus::Finished;
        Ok(true)
    }

    async fn add_participant(
        &self,
        room: &RoomId,
        player: &PlayerId,
        display_name: &str,
        kind: PlayerKind,
    ) -> Result<(), DirectoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.rooms.contains_key(room) {
            return Err(DirectoryError::RoomNotFound(room.clone()));
        }
        let list = tables.participants.entry(room.clone()).or_default();
        match list.iter_mut().find(|p| &p.player_id == player) {
            Some(existing) => {
                existing.active = true;
                existing.display_name = display_name.to_string();
            }
            None => list.push(Participant {
                player_id: player.clone(),
                display_name: display_name.to_string(),
                kind,
                active: true,
            }),
        }
        Ok(())
    }

    async fn remove_participant(
        &self,
        room: &RoomId,
        player: &PlayerId,
    ) -> Result<(), DirectoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(p) = tables
            .participants
            .get_mut(room)
            .and_then(|list| list.iter_mut().find(|p| &p.player_id == player))
        {
            p.active = false;
        }
        Ok(())
    }

    async fn active_participants(&self, room: &RoomId) -> Result<Vec<Participant>, DirectoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .participants
            .get(room)
            .map(|list| list.iter().filter(|p| p.active).cloned().collect())
            .unwrap_or_default())
    }

    async fn record_results(
        &self,
        match_id: MatchId,
        results: Vec<MatchResult>,
    ) -> Result<(), DirectoryError> {
        let mut tables = self.tables.lock().await;
        if !tables.matches.contains_key(&match_id) {
            return Err(DirectoryError::MatchNotFound(match_id));
        }
        if tables.results.contains_key(&match_id) {
            return Err(DirectoryError::ResultsAlreadyRecorded(match_id));
        }
        tables.results.insert(match_id, results);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_uses_unambiguous_alphabet() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
            assert!(!code.contains('O') && !code.contains('0') && !code.contains('I'));
        }
    }

    #[tokio::test]
    async fn test_create_room_generates_id_and_code() {
        let dir = InMemoryDirectory::new();
        let a = dir.create_room(None).await.unwrap();
        let b = dir.create_room(None).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.code, b.code);

        let found = dir.find_by_code(&a.code.to_lowercase()).await.unwrap();
        assert_eq!(found.map(|r| r.id), Some(a.id));
    }

    #[tokio::test]
    async fn test_create_room_rejects_duplicate_id() {
        let dir = InMemoryDirectory::new();
        dir.create_room(Some(RoomId::new("r1"))).await.unwrap();
        let again = dir.create_room(Some(RoomId::new("r1"))).await;
        assert!(matches!(again, Err(DirectoryError::RoomExists(_))));
    }

    #[tokio::test]
    async fn test_begin_match_becomes_current_and_finishes_once() {
        let dir = InMemoryDirectory::new();
        let room = dir.create_room(Some(RoomId::new("r1"))).await.unwrap().id;
        let started = Utc::now();
        let m = dir.begin_match(&room, Some(60), started).await.unwrap();

        let current = dir.current_match(&room).await.unwrap().unwrap();
        assert_eq!(current.id, m);
        assert_eq!(current.started_at, started);
        assert_eq!(current.status, MatchStatus::Running);

        assert!(dir.finish_match(m).await.unwrap());
        assert!(!dir.finish_match(m).await.unwrap());
    }

    #[tokio::test]
    async fn test_participants_keep_join_order_and_reactivate() {
        let dir = InMemoryDirectory::new();
        let room = dir.create_room(Some(RoomId::new("r1"))).await.unwrap().id;
        for p in ["p1", "p2", "p3"] {
            dir.add_participant(&room, &PlayerId::new(p), p, PlayerKind::Human)
                .await
                .unwrap();
        }
        dir.remove_participant(&room, &PlayerId::new("p2")).await.unwrap();
        let ids: Vec<_> = dir
            .active_participants(&room)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.player_id.0)
            .collect();
        assert_eq!(ids, ["p1", "p3"]);

        dir.add_participant(&room, &PlayerId::new("p2"), "p2", PlayerKind::Human)
            .await
            .unwrap();
        let ids: Vec<_> = dir
            .active_participants(&room)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.player_id.0)
            .collect();
        assert_eq!(ids, ["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_results_are_written_once() {
        let dir = InMemoryDirectory::new();
        let room = dir.create_room(Some(RoomId::new("r1"))).await.unwrap().id;
        let m = dir.begin_match(&room, None, Utc::now()).await.unwrap();
        dir.record_results(m, Vec::new()).await.unwrap();
        let again = dir.record_results(m, Vec::new()).await;
        assert!(matches!(again, Err(DirectoryError::ResultsAlreadyRecorded(_))));
    }
}
