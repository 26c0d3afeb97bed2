use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use log::*;
use serde::Serialize;
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
};

use crate::hub::{HubError, Room};

pub type ConnectionId = u64;

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// How many messages may wait for a connection before it is considered too slow and dropped.
    pub outbound_queue_size: usize,
    /// Capacity of the hub's own request queue.
    pub command_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self { outbound_queue_size: 64, command_buffer: 256 }
    }
}

/// The receiving end of a registered connection.
///
/// The transport drains `receiver` and writes each message to the remote peer. When the hub drops the connection
/// (because it unregistered, fell behind, or the hub shut down), `receiver` yields `None`.
#[derive(Debug)]
pub struct Subscriber {
    pub id: ConnectionId,
    pub receiver: mpsc::Receiver<Arc<str>>,
}

impl Subscriber {
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        self.receiver.recv().await
    }
}

struct Connection {
    id: ConnectionId,
    rooms: HashSet<Room>,
    sender: mpsc::Sender<Arc<str>>,
}

impl Connection {
    fn is_interested(&self, room: Option<&Room>) -> bool {
        room.map_or(true, |r| self.rooms.contains(r))
    }
}

enum HubCommand {
    Register(Connection),
    Unregister(ConnectionId),
    Broadcast { room: Option<Room>, payload: Arc<str> },
    ConnectionCount(oneshot::Sender<usize>),
    RoomSize(Room, oneshot::Sender<usize>),
    Shutdown,
}

/// The hub actor. Create one with [`ConnectionHub::new`], run it with [`ConnectionHub::run`] (or use
/// [`ConnectionHub::spawn`]), and talk to it through the returned [`HubHandle`].
pub struct ConnectionHub {
    commands: mpsc::Receiver<HubCommand>,
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (sender, receiver) = mpsc::channel(config.command_buffer.max(1));
        let hub = Self { commands: receiver, connections: HashMap::new() };
        let handle = HubHandle {
            commands: sender,
            next_id: Arc::new(AtomicU64::new(1)),
            queue_size: config.outbound_queue_size.max(1),
        };
        (hub, handle)
    }

    /// Creates a hub and runs it on a new task.
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(config);
        let task = tokio::spawn(hub.run());
        (handle, task)
    }

    /// Processes requests until [`HubHandle::shutdown`] is called or every handle has been dropped. Any connections
    /// still registered at that point are closed.
    pub async fn run(mut self) {
        info!("📡️ Connection hub is running");
        while let Some(command) = self.commands.recv().await {
            match command {
                HubCommand::Register(conn) => self.register(conn),
                HubCommand::Unregister(id) => {
                    if self.connections.remove(&id).is_some() {
                        debug!("📡️ Connection #{id} unregistered. {} connections remain", self.connections.len());
                    }
                },
                HubCommand::Broadcast { room, payload } => self.broadcast(room.as_ref(), payload),
                HubCommand::ConnectionCount(reply) => {
                    let _ = reply.send(self.connections.len());
                },
                HubCommand::RoomSize(room, reply) => {
                    let n = self.connections.values().filter(|c| c.rooms.contains(&room)).count();
                    let _ = reply.send(n);
                },
                HubCommand::Shutdown => {
                    debug!("📡️ Connection hub received shutdown request");
                    break;
                },
            }
        }
        let closed = self.connections.len();
        self.connections.clear();
        info!("📡️ Connection hub has stopped. {closed} connections were closed");
    }

    fn register(&mut self, conn: Connection) {
        let id = conn.id;
        let rooms = conn.rooms.iter().map(Room::as_str).collect::<Vec<_>>().join(", ");
        debug!("📡️ Connection #{id} registered for [{rooms}]");
        self.connections.insert(id, conn);
    }

    fn broadcast(&mut self, room: Option<&Room>, payload: Arc<str>) {
        let mut delivered = 0usize;
        let mut dropped = Vec::new();
        for conn in self.connections.values().filter(|c| c.is_interested(room)) {
            match conn.sender.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("📡️ Connection #{} is not keeping up with its messages. Disconnecting it.", conn.id);
                    dropped.push(conn.id);
                },
                Err(TrySendError::Closed(_)) => {
                    debug!("📡️ Connection #{} has gone away. Removing it.", conn.id);
                    dropped.push(conn.id);
                },
            }
        }
        for id in &dropped {
            self.connections.remove(id);
        }
        let target = room.map(Room::as_str).unwrap_or("everyone");
        trace!("📡️ Broadcast to {target} delivered to {delivered} connections, {} dropped", dropped.len());
    }
}

/// A cheap, cloneable client of the [`ConnectionHub`].
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    next_id: Arc<AtomicU64>,
    queue_size: usize,
}

impl HubHandle {
    /// Registers a new connection with interest in the given rooms.
    pub async fn register<I: IntoIterator<Item = Room>>(&self, rooms: I) -> Result<Subscriber, HubError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.queue_size);
        let conn = Connection { id, rooms: rooms.into_iter().collect(), sender };
        self.send(HubCommand::Register(conn)).await?;
        Ok(Subscriber { id, receiver })
    }

    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.send(HubCommand::Unregister(id)).await
    }

    /// Queues `message` for every connection interested in `room`. The message is serialized once, here.
    pub async fn broadcast_to_room<T: Serialize>(&self, room: &Room, message: &T) -> Result<(), HubError> {
        let payload = serde_json::to_string(message)?;
        self.send(HubCommand::Broadcast { room: Some(room.clone()), payload: payload.into() }).await
    }

    pub async fn broadcast_all<T: Serialize>(&self, message: &T) -> Result<(), HubError> {
        let payload = serde_json::to_string(message)?;
        self.send(HubCommand::Broadcast { room: None, payload: payload.into() }).await
    }

    pub async fn connection_count(&self) -> Result<usize, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::ConnectionCount(tx)).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    pub async fn room_size(&self, room: &Room) -> Result<usize, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::RoomSize(room.clone(), tx)).await?;
        rx.await.map_err(|_| HubError::Stopped)
    }

    /// Asks the hub to stop. Registered connections are closed. Has no effect if the hub has already stopped.
    pub async fn shutdown(&self) {
        let _ = self.send(HubCommand::Shutdown).await;
    }

    pub fn is_stopped(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands.send(command).await.map_err(|_| HubError::Stopped)
    }
}
