mod broadcast;
mod connection;
mod msg;
mod registry;
mod room;
mod session;
mod ws;

use axum::{routing::get, Router};

use crate::AppState;

pub use broadcast::{Broadcaster, Delivery};
pub use connection::{ClientConnection, ConnectionId, Frame};
pub use msg::{ClientEvent, Sender, ServerEvent, ANONYMOUS};
pub use registry::RoomRegistry;
pub use session::{ChatService, ChatSession, SessionEvent, SessionState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::room_ws))
        .route("/api/messages/{room}", get(room::history))
        .route("/api/channels", get(room::channels))
}
