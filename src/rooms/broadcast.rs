//! Fan-out of server events to every member of a room.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::{connection::Frame, registry::RoomRegistry};

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub recipients: usize,
    pub dropped: usize,
}

#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Sends `event` to each connection in `room` at the time of the call.
    ///
    /// Every recipient is handed the frame independently; a full or closed
    /// outbox loses this frame for that connection only.
    pub async fn broadcast<E: Serialize>(&self, room: &str, event: &E) -> Delivery {
        let frame: Frame = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!(room, error = %e, "failed to serialize broadcast");
                return Delivery::default();
            }
        };

        let members = self.registry.members_of(room).await;
        let mut delivery = Delivery {
            recipients: members.len(),
            dropped: 0,
        };
        for conn in members {
            if !conn.send(Arc::clone(&frame)) {
                delivery.dropped += 1;
                warn!(conn_id = %conn.id, room, total_drops = conn.drop_count(), "dropped frame for slow or closed client");
            }
        }
        debug!(room, recipients = delivery.recipients, dropped = delivery.dropped, "broadcast");
        delivery
    }
}
