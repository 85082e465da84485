//! The two store traits and the in-process backend.
//!
//! [`StoreBackend`] is what a concrete storage engine implements; it
//! reports failures. [`StateStore`] is the contract the game engine sees;
//! it never fails loudly, because degradation is handled underneath.

use async_trait::async_trait;
use dashmap::DashMap;
use setforge_protocol::{GameState, RoomId};

use crate::StoreError;

/// A concrete key-value backend for room states.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    async fn load(&self, room: &RoomId) -> Result<Option<GameState>, StoreError>;

    async fn store(&self, room: &RoomId, state: &GameState) -> Result<(), StoreError>;

    async fn remove(&self, room: &RoomId) -> Result<(), StoreError>;
}

/// The room state store as the engine uses it.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    /// The freshest available state for `room`, or `None`.
    async fn get(&self, room: &RoomId) -> Option<GameState>;

    /// Persists `state`. Returns `false` only if it was stored nowhere.
    async fn save(&self, room: &RoomId, state: &GameState) -> bool;

    /// Removes the room from every tier. Idempotent.
    async fn delete(&self, room: &RoomId);

    /// Highest sequence number acknowledged for `room` by this process.
    fn high_water(&self, _room: &RoomId) -> Option<u64> {
        None
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local map. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: DashMap<RoomId, GameState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn contains(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, room: &RoomId) -> Result<Option<GameState>, StoreError> {
        Ok(self.rooms.get(room).map(|entry| entry.value().clone()))
    }

    async fn store(&self, room: &RoomId, state: &GameState) -> Result<(), StoreError> {
        self.rooms.insert(room.clone(), state.clone());
        Ok(())
    }

    async fn remove(&self, room: &RoomId) -> Result<(), StoreError> {
        self.rooms.remove(room);
        Ok(())
    }
}
