use std::sync::Arc;

use axum::{debug_handler, extract::{Path, State}, Json};

use super::session::ChatService;
use crate::{store::{Message, RoomEntry, Store}, AppResult};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    State(chat): State<Arc<ChatService>>,
    Path(room): Path<String>,
) -> AppResult<Json<Vec<Message>>> {
    Ok(Json(chat.history(&room).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn channels(State(store): State<Store>) -> AppResult<Json<Vec<RoomEntry>>> {
    Ok(Json(store.rooms().await?))
}
