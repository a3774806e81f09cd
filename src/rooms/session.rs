//! Per-connection chat protocol. One [`ChatSession`] actor per socket, all
//! sharing a [`ChatService`].

use std::{
    collections::HashMap,
    ops::ControlFlow,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use time::OffsetDateTime;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use super::{
    broadcast::Broadcaster,
    connection::{ClientConnection, ConnectionId},
    msg::{ClientEvent, Sender, ServerEvent},
    registry::RoomRegistry,
};
use crate::{
    error::{require_non_empty, CoreError, CoreResult},
    store::{Message, NewMessage, Store},
};

/// Wall-clock time that never repeats or goes backwards within the process.
#[derive(Debug, Default)]
struct MonotonicClock {
    last_nanos: AtomicI64,
}

impl MonotonicClock {
    fn now(&self) -> OffsetDateTime {
        self.next_after(OffsetDateTime::now_utc())
    }

    fn next_after(&self, wall: OffsetDateTime) -> OffsetDateTime {
        let wall_nanos = i64::try_from(wall.unix_timestamp_nanos()).unwrap_or(i64::MAX);
        let mut next = wall_nanos;
        let _ = self.last_nanos.fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            next = wall_nanos.max(last.saturating_add(1));
            Some(next)
        });
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(next)).unwrap_or(wall)
    }
}

pub struct ChatService {
    store: Store,
    registry: Arc<RoomRegistry>,
    broadcaster: Broadcaster,
    clock: MonotonicClock,
    // Held across persist + broadcast so live order matches stored order.
    // An entry lives only while some send to that room is in flight.
    publish_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatService {
    pub fn new(store: Store, registry: Arc<RoomRegistry>) -> Self {
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        Self {
            store,
            registry,
            broadcaster,
            clock: MonotonicClock::default(),
            publish_locks: Mutex::default(),
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Rooms need no creation step; joining an unknown name is fine.
    pub async fn join(&self, conn: &Arc<ClientConnection>, room: &str) -> CoreResult<bool> {
        require_non_empty("room", room)?;
        let added = self.registry.join(conn, room).await;
        debug!(conn_id = %conn.id, room, added, "join");
        Ok(added)
    }

    pub async fn leave(&self, id: ConnectionId, room: &str) -> CoreResult<bool> {
        require_non_empty("room", room)?;
        let removed = self.registry.leave(id, room).await;
        debug!(conn_id = %id, room, removed, "leave");
        Ok(removed)
    }

    /// Persists a message and, only once it is durable, fans it out to the room.
    ///
    /// A persistence failure is returned to the caller and nothing is broadcast.
    pub async fn send_message(&self, room: &str, content: &str, sender: Sender) -> CoreResult<Message> {
        require_non_empty("room", room)?;
        require_non_empty("content", content)?;

        let lock = self.publish_lock(room).await;
        let result = {
            let _guard = lock.lock().await;
            self.publish(room, content, sender).await
        };
        self.release_publish_lock(room, lock).await;
        result
    }

    async fn publish(&self, room: &str, content: &str, sender: Sender) -> CoreResult<Message> {
        let new = NewMessage {
            room: room.to_owned(),
            sender,
            content: content.to_owned(),
            created_at: self.clock.now(),
        };
        let message = match self.store.insert_message(new).await {
            Ok(message) => message,
            Err(e) => {
                error!(room, error = %e, "failed to persist chat message");
                return Err(CoreError::Persistence(e));
            }
        };

        let delivery = self
            .broadcaster
            .broadcast(room, &ServerEvent::ChatMessage(message.clone()))
            .await;
        info!(
            room,
            message_id = message.id,
            sender = message.sender.label(),
            recipients = delivery.recipients,
            "chat message"
        );
        Ok(message)
    }

    pub async fn history(&self, room: &str) -> CoreResult<Vec<Message>> {
        require_non_empty("room", room)?;
        Ok(self.store.query_messages(room).await?)
    }

    /// Removes every membership of `id`. Safe to call more than once.
    pub async fn disconnect(&self, id: ConnectionId) {
        let rooms = self.registry.leave_all(id).await;
        debug!(conn_id = %id, rooms = rooms.len(), "left all rooms");
    }

    async fn publish_lock(&self, room: &str) -> Arc<Mutex<()>> {
        let mut locks = self.publish_locks.lock().await;
        Arc::clone(locks.entry(room.to_owned()).or_default())
    }

    async fn release_publish_lock(&self, room: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.publish_locks.lock().await;
        // Only the map and `lock` itself hold it: no other send is waiting.
        let idle = locks.get(room).is_some_and(|held| Arc::ptr_eq(held, &lock)) && Arc::strong_count(&lock) == 2;
        if idle {
            locks.remove(room);
        }
    }
}

/// Input to a [`ChatSession`], fed by the socket reader.
#[derive(Debug)]
pub enum SessionEvent {
    Client(ClientEvent),
    /// A frame that could not be decoded as a [`ClientEvent`].
    Malformed(String),
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Disconnected,
}

pub struct ChatSession {
    service: Arc<ChatService>,
    conn: Arc<ClientConnection>,
    state: SessionState,
}

impl ChatSession {
    pub fn new(service: Arc<ChatService>, conn: Arc<ClientConnection>) -> Self {
        Self {
            service,
            conn,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Processes events until a disconnect arrives or the queue closes.
    ///
    /// Events already queued before the disconnect are still handled, so a
    /// message the client managed to send is persisted and broadcast.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = inbound.recv().await {
            if self.handle(event).await.is_break() {
                break;
            }
        }
        self.on_disconnect().await;
    }

    pub async fn handle(&mut self, event: SessionEvent) -> ControlFlow<()> {
        if self.state == SessionState::Disconnected {
            return ControlFlow::Break(());
        }

        match event {
            SessionEvent::Client(ClientEvent::JoinRoom { room }) => self.on_join(room).await,
            SessionEvent::Client(ClientEvent::LeaveRoom { room }) => self.on_leave(room).await,
            SessionEvent::Client(ClientEvent::ChatMessage { room, content, sender }) => {
                self.on_chat_message(room, content, Sender::from_claimed(sender)).await
            }
            SessionEvent::Malformed(reason) => {
                debug!(conn_id = %self.conn.id, reason = %reason, "malformed client frame");
                self.reply(&ServerEvent::Error {
                    kind: "protocol",
                    message: reason,
                });
            }
            SessionEvent::Disconnect => {
                self.on_disconnect().await;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn on_join(&mut self, room: String) {
        match self.service.join(&self.conn, &room).await {
            Ok(_) => self.reply(&ServerEvent::Joined { room }),
            Err(e) => self.reply_error(&e),
        }
    }

    async fn on_leave(&mut self, room: String) {
        match self.service.leave(self.conn.id, &room).await {
            Ok(_) => self.reply(&ServerEvent::Left { room }),
            Err(e) => self.reply_error(&e),
        }
    }

    async fn on_chat_message(&mut self, room: String, content: String, sender: Sender) {
        if let Err(e) = self.service.send_message(&room, &content, sender).await {
            self.reply_error(&e);
        }
    }

    async fn on_disconnect(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.service.disconnect(self.conn.id).await;
        self.state = SessionState::Disconnected;
    }

    fn reply_error(&self, e: &CoreError) {
        self.reply(&ServerEvent::Error {
            kind: e.kind(),
            message: e.to_string(),
        });
    }

    fn reply(&self, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => {
                if !self.conn.send(json.into()) {
                    warn!(conn_id = %self.conn.id, "could not queue reply");
                }
            }
            Err(e) => warn!(conn_id = %self.conn.id, error = %e, "failed to serialize reply"),
        }
    }
}
