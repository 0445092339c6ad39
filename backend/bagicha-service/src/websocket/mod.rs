use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod fanout;
pub mod message_types;

pub use events::ServerEvent;
pub use message_types::ClientEvent;

const GLOBAL_ROOM: &str = "global";
const USER_ROOM_PREFIX: &str = "user_";

/// Unique identifier for a socket connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A broadcast scope.
///
/// `user_{id}` rooms hold every socket of one user, `global` holds every
/// socket, and named rooms are free-form scopes such as lowercase city names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    User(Uuid),
    Global,
    Named(String),
}

impl Room {
    pub fn name(&self) -> String {
        match self {
            Room::User(id) => format!("{USER_ROOM_PREFIX}{id}"),
            Room::Global => GLOBAL_ROOM.to_string(),
            Room::Named(name) => name.clone(),
        }
    }

    /// Parse a room name sent by a client. Blank names yield `None`.
    pub fn parse(name: &str) -> Option<Room> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if name.eq_ignore_ascii_case(GLOBAL_ROOM) {
            return Some(Room::Global);
        }
        if let Some(id) = name
            .strip_prefix(USER_ROOM_PREFIX)
            .and_then(|rest| Uuid::parse_str(rest).ok())
        {
            return Some(Room::User(id));
        }
        Some(Room::Named(name.to_lowercase()))
    }

    /// Room for posts in `city`; `None` when the city is blank.
    pub fn city(city: &str) -> Option<Room> {
        let city = city.trim();
        if city.is_empty() {
            None
        } else {
            Some(Room::Named(city.to_lowercase()))
        }
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Default)]
struct Inner {
    senders: HashMap<ConnectionId, UnboundedSender<String>>,
    rooms: HashMap<Room, HashSet<ConnectionId>>,
    memberships: HashMap<ConnectionId, HashSet<Room>>,
}

impl Inner {
    fn remove_connection(&mut self, conn: ConnectionId) {
        self.senders.remove(&conn);
        if let Some(rooms) = self.memberships.remove(&conn) {
            for room in rooms {
                if let Some(members) = self.rooms.get_mut(&room) {
                    members.remove(&conn);
                    if members.is_empty() {
                        self.rooms.remove(&room);
                    }
                }
            }
        }
    }
}

/// Room membership registry for socket connections
///
/// Cloning shares state. Each registered connection owns an unbounded
/// channel; `emit` writes serialized events into it and the session actor
/// forwards them to the socket.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. It belongs to no rooms yet.
    pub async fn register(&self) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let conn = ConnectionId::new();
        self.inner.write().await.senders.insert(conn, tx);
        tracing::debug!(connection = %conn, "registered socket connection");
        (conn, rx)
    }

    /// Add `conn` to `room`. Returns false when the connection is unknown.
    pub async fn join(&self, room: &Room, conn: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        if !guard.senders.contains_key(&conn) {
            return false;
        }
        guard.rooms.entry(room.clone()).or_default().insert(conn);
        guard.memberships.entry(conn).or_default().insert(room.clone());
        tracing::debug!(connection = %conn, room = %room, "joined room");
        true
    }

    pub async fn leave(&self, room: &Room, conn: ConnectionId) {
        let mut guard = self.inner.write().await;
        if let Some(members) = guard.rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                guard.rooms.remove(room);
            }
        }
        if let Some(rooms) = guard.memberships.get_mut(&conn) {
            rooms.remove(room);
        }
    }

    /// Drop the connection and every membership it holds.
    pub async fn leave_all(&self, conn: ConnectionId) {
        self.inner.write().await.remove_connection(conn);
        tracing::debug!(connection = %conn, "removed socket connection");
    }

    /// Deliver `event` to every connection in any of `rooms`.
    ///
    /// A connection in several targeted rooms receives one copy. Closed
    /// channels are pruned. Returns the number of deliveries.
    pub async fn emit(&self, rooms: &[Room], event: &ServerEvent) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, event = event.name(), "failed to serialize event");
                return 0;
            }
        };
        self.emit_raw(rooms, payload).await
    }

    async fn emit_raw(&self, rooms: &[Room], payload: String) -> usize {
        let mut guard = self.inner.write().await;

        let targets: HashSet<ConnectionId> = rooms
            .iter()
            .filter_map(|room| guard.rooms.get(room))
            .flat_map(|members| members.iter().copied())
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for conn in targets {
            match guard.senders.get(&conn) {
                Some(sender) if sender.send(payload.clone()).is_ok() => delivered += 1,
                _ => dead.push(conn),
            }
        }

        if !dead.is_empty() {
            tracing::debug!(count = dead.len(), "pruning closed socket connections");
            for conn in dead {
                guard.remove_connection(conn);
            }
        }

        delivered
    }

    pub async fn room_size(&self, room: &Room) -> usize {
        let guard = self.inner.read().await;
        guard.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.senders.len()
    }
}
