//! Fan-out of server events to connections.
//!
//! Each connection owns the receiving end of an unbounded channel; the hub
//! keeps the senders and which room each connection is in. A closed
//! receiver is pruned the next time something is sent to it.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use setforge_protocol::{ConnectionId, PlayerId, Recipient, RoomId, ServerEvent};
use tokio::sync::mpsc;

/// How the service reaches clients.
pub trait Broadcaster: Send + Sync {
    /// Every connection in `room`.
    fn to_room(&self, room: &RoomId, event: &ServerEvent);

    fn to_connection(&self, connection: ConnectionId, event: &ServerEvent);

    /// Connections in `room` selected by `recipient`.
    fn dispatch(&self, room: &RoomId, recipient: &Recipient, event: &ServerEvent);
}

struct Link {
    player: PlayerId,
    room: Option<RoomId>,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Default)]
struct Registry {
    links: HashMap<ConnectionId, Link>,
    rooms: HashMap<RoomId, BTreeSet<ConnectionId>>,
}

impl Registry {
    fn leave(&mut self, connection: ConnectionId) -> Option<RoomId> {
        let room = self.links.get_mut(&connection)?.room.take()?;
        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&connection);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
        Some(room)
    }

    fn drop_link(&mut self, connection: ConnectionId) {
        self.leave(connection);
        self.links.remove(&connection);
    }
}

/// The in-process [`Broadcaster`].
#[derive(Default)]
pub struct RoomHub {
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

impl RoomHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection for `player` and returns its id with the
    /// stream of events addressed to it.
    pub fn open(&self, player: PlayerId) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().links.insert(
            id,
            Link {
                player,
                room: None,
                tx,
            },
        );
        (id, rx)
    }

    /// Points an existing connection at another player. Used when a
    /// connection opened anonymously authenticates.
    pub fn rebind(&self, connection: ConnectionId, player: PlayerId) {
        if let Some(link) = self.lock().links.get_mut(&connection) {
            link.player = player;
        }
    }

    /// Unregisters a connection. Its receiver sees the channel close.
    pub fn close(&self, connection: ConnectionId) {
        self.lock().drop_link(connection);
    }

    /// Moves a connection into `room`, leaving any previous room.
    pub fn join(&self, connection: ConnectionId, room: RoomId) -> bool {
        let mut registry = self.lock();
        if !registry.links.contains_key(&connection) {
            return false;
        }
        registry.leave(connection);
        if let Some(link) = registry.links.get_mut(&connection) {
            link.room = Some(room.clone());
        }
        registry.rooms.entry(room).or_default().insert(connection);
        true
    }

    /// Takes a connection out of its room, returning the room it was in.
    pub fn leave(&self, connection: ConnectionId) -> Option<RoomId> {
        self.lock().leave(connection)
    }

    pub fn room_of(&self, connection: ConnectionId) -> Option<RoomId> {
        self.lock().links.get(&connection)?.room.clone()
    }

    /// Connections in `room`, ascending.
    pub fn members(&self, room: &RoomId) -> Vec<ConnectionId> {
        self.lock()
            .rooms
            .get(room)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.lock().links.len()
    }

    fn send_where(
        &self,
        room: &RoomId,
        event: &ServerEvent,
        select: impl Fn(&PlayerId) -> bool,
    ) -> usize {
        let mut registry = self.lock();
        let Some(members) = registry.rooms.get(room) else {
            return 0;
        };
        let mut sent = 0;
        let mut dead = Vec::new();
        for id in members {
            let Some(link) = registry.links.get(id) else {
                continue;
            };
            if !select(&link.player) {
                continue;
            }
            if link.tx.send(event.clone()).is_ok() {
                sent += 1;
            } else {
                dead.push(*id);
            }
        }
        for id in dead {
            tracing::debug!(connection = %id, room_id = %room, "pruning closed connection");
            registry.drop_link(id);
        }
        sent
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Broadcaster for RoomHub {
    fn to_room(&self, room: &RoomId, event: &ServerEvent) {
        let sent = self.send_where(room, event, |_| true);
        tracing::trace!(room_id = %room, sent, "broadcast");
    }

    fn to_connection(&self, connection: ConnectionId, event: &ServerEvent) {
        let mut registry = self.lock();
        let delivered = registry
            .links
            .get(&connection)
            .is_some_and(|link| link.tx.send(event.clone()).is_ok());
        if !delivered && registry.links.contains_key(&connection) {
            tracing::debug!(%connection, "pruning closed connection");
            registry.drop_link(connection);
        }
    }

    fn dispatch(&self, room: &RoomId, recipient: &Recipient, event: &ServerEvent) {
        match recipient {
            Recipient::All => self.to_room(room, event),
            Recipient::Player(p) => {
                self.send_where(room, event, |player| player == p);
            }
            Recipient::AllExcept(p) => {
                self.send_where(room, event, |player| player != p);
            }
        }
    }
}
