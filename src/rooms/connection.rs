use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serialized server event, shared between every recipient of a broadcast.
pub type Frame = Arc<str>;

/// Outbound half of one live socket.
///
/// Frames are queued without waiting; the socket writer task drains the queue.
#[derive(Debug)]
pub struct ClientConnection {
    pub id: ConnectionId,
    outbox: mpsc::Sender<Frame>,
    dropped: AtomicU64,
}

impl ClientConnection {
    pub fn new(id: ConnectionId, outbox: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            outbox,
            dropped: AtomicU64::new(0),
        }
    }

    /// Creates a connection together with the receiving end of its outbox.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self::new(ConnectionId::new(), tx)), rx)
    }

    /// Queues `frame`, returning `false` if the outbox is full or closed.
    pub fn send(&self, frame: Frame) -> bool {
        match self.outbox.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Closed(_)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
