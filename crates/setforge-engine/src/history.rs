//! Append-only move and snapshot history.
//!
//! History is supplementary: the engine logs write failures and carries on.
//! Recovery reads the latest snapshot of a match.

use std::collections::HashMap;

use async_trait::async_trait;
use setforge_protocol::{MatchId, MoveRecord, SnapshotId, SnapshotRecord};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history backend unavailable: {0}")]
    Unavailable(String),

    #[error("match {0} has no history")]
    UnknownMatch(MatchId),
}

/// Durable per-match history.
#[async_trait]
pub trait HistoryWriter: Send + Sync + 'static {
    async fn append_snapshot(&self, snapshot: SnapshotRecord) -> Result<SnapshotId, HistoryError>;

    async fn append_move(&self, record: MoveRecord) -> Result<(), HistoryError>;

    /// The most recently appended snapshot for `match_id`.
    async fn latest_snapshot(
        &self,
        match_id: MatchId,
    ) -> Result<Option<(SnapshotId, SnapshotRecord)>, HistoryError>;

    /// Every move of `match_id`, in append order.
    async fn moves(&self, match_id: MatchId) -> Result<Vec<MoveRecord>, HistoryError>;
}

// ---------------------------------------------------------------------------
// InMemoryHistory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Log {
    next_snapshot: u64,
    snapshots: HashMap<MatchId, Vec<(SnapshotId, SnapshotRecord)>>,
    moves: HashMap<MatchId, Vec<MoveRecord>>,
}

/// Process-local history, for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryHistory {
    log: Mutex<Log>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every snapshot of `match_id`, in append order.
    pub async fn snapshots(&self, match_id: MatchId) -> Vec<(SnapshotId, SnapshotRecord)> {
        let log = self.log.lock().await;
        log.snapshots.get(&match_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl HistoryWriter for InMemoryHistory {
    async fn append_snapshot(&self, snapshot: SnapshotRecord) -> Result<SnapshotId, HistoryError> {
        let mut log = self.log.lock().await;
        log.next_snapshot += 1;
        let id = SnapshotId(log.next_snapshot);
        log.snapshots
            .entry(snapshot.match_id)
            .or_default()
            .push((id, snapshot));
        Ok(id)
    }

    async fn append_move(&self, record: MoveRecord) -> Result<(), HistoryError> {
        let mut log = self.log.lock().await;
        log.moves.entry(record.match_id).or_default().push(record);
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        match_id: MatchId,
    ) -> Result<Option<(SnapshotId, SnapshotRecord)>, HistoryError> {
        let log = self.log.lock().await;
        Ok(log
            .snapshots
            .get(&match_id)
            .and_then(|list| list.last().cloned()))
    }

    async fn moves(&self, match_id: MatchId) -> Result<Vec<MoveRecord>, HistoryError> {
        let log = self.log.lock().await;
        Ok(log.moves.get(&match_id).cloned().unwrap_or_default())
    }
}
