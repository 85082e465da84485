//! Primary cache with an in-process fallback.
//!
//! Reads consult both tiers and return the freshest copy by
//! `sequence_number`. A per-room high-water mark records the highest
//! sequence this process has persisted, so a stale primary (for example
//! one that lost writes while it was unreachable) can never roll a room
//! back.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use setforge_protocol::{GameState, RoomId};
use tokio::time::timeout;

use crate::{MemoryStore, StateStore, StoreBackend, StoreConfig, StoreError};

/// Where the most recent successful save landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    Primary,
    Fallback,
}

pub struct ResilientStore {
    primary: Option<Arc<dyn StoreBackend>>,
    fallback: MemoryStore,
    high_water: DashMap<RoomId, u64>,
    config: StoreConfig,
}

impl ResilientStore {
    /// A store with `primary` in front of the in-process map.
    pub fn new(primary: Arc<dyn StoreBackend>, config: StoreConfig) -> Self {
        Self {
            primary: Some(primary),
            fallback: MemoryStore::new(),
            high_water: DashMap::new(),
            config: config.validated(),
        }
    }

    /// A store with no cache at all; every save lands in-process.
    pub fn memory_only() -> Self {
        Self {
            primary: None,
            fallback: MemoryStore::new(),
            high_water: DashMap::new(),
            config: StoreConfig::default(),
        }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Number of rooms currently held only in-process.
    pub fn fallback_len(&self) -> usize {
        self.fallback.len()
    }

    /// Saves and reports which tier took the write.
    pub async fn save_to(&self, room: &RoomId, state: &GameState) -> Option<SaveTarget> {
        if let Some(mark) = self.high_water(room) {
            if state.sequence_number < mark {
                tracing::warn!(
                    room = %room,
                    sequence = state.sequence_number,
                    high_water = mark,
                    "refusing to persist a state older than the high-water mark"
                );
                return None;
            }
        }

        let stored = match self.primary.as_deref() {
            Some(primary) => self.bounded(room, primary.store(room, state)).await,
            None => Err(StoreError::Unavailable("no cache configured".into())),
        };
        let target = match stored {
            Ok(()) => {
                // The primary is now authoritative; a leftover local copy
                // would only shadow it on tie.
                let _ = self.fallback.remove(room).await;
                SaveTarget::Primary
            }
            Err(e) => {
                if self.primary.is_some() {
                    tracing::warn!(room = %room, error = %e, "cache save failed, using fallback");
                }
                let _ = self.fallback.store(room, state).await;
                SaveTarget::Fallback
            }
        };

        self.high_water
            .entry(room.clone())
            .and_modify(|mark| *mark = (*mark).max(state.sequence_number))
            .or_insert(state.sequence_number);
        Some(target)
    }

    async fn bounded<T>(
        &self,
        room: &RoomId,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match timeout(self.config.op_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(room = %room, "cache call timed out");
                Err(StoreError::Timeout("call"))
            }
        }
    }

    fn fresh_enough(&self, room: &RoomId, state: &GameState, tier: &'static str) -> bool {
        match self.high_water(room) {
            Some(mark) if state.sequence_number < mark => {
                tracing::warn!(
                    room = %room,
                    tier,
                    sequence = state.sequence_number,
                    high_water = mark,
                    "discarding stale copy"
                );
                false
            }
            _ => true,
        }
    }
}

#[async_trait]
impl StateStore for ResilientStore {
    async fn get(&self, room: &RoomId) -> Option<GameState> {
        let cached = match self.primary.as_deref() {
            Some(primary) => match self.bounded(room, primary.load(room)).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(room = %room, error = %e, "cache read failed");
                    None
                }
            },
            None => None,
        };
        let local = self.fallback.load(room).await.ok().flatten();

        let cached = cached.filter(|s| self.fresh_enough(room, s, "primary"));
        let local = local.filter(|s| self.fresh_enough(room, s, "fallback"));

        match (cached, local) {
            (Some(c), Some(l)) => {
                if c.sequence_number > l.sequence_number {
                    Some(c)
                } else {
                    Some(l)
                }
            }
            (Some(c), None) => Some(c),
            (None, l) => l,
        }
    }

    async fn save(&self, room: &RoomId, state: &GameState) -> bool {
        self.save_to(room, state).await.is_some()
    }

    async fn delete(&self, room: &RoomId) {
        if let Some(primary) = self.primary.as_deref() {
            if let Err(e) = self.bounded(room, primary.remove(room)).await {
                tracing::warn!(room = %room, error = %e, "cache delete failed");
            }
        }
        let _ = self.fallback.remove(room).await;
        self.high_water.remove(room);
    }

    fn high_water(&self, room: &RoomId) -> Option<u64> {
        self.high_water.get(room).map(|mark| *mark)
    }
}
