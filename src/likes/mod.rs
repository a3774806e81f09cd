mod toggle;

use axum::{debug_handler, extract::{Path, State}, routing::{get, post}, Json, Router};
use serde::Serialize;

use crate::{auth::Actor, AppResult, AppState};

pub use toggle::{ToggleCoordinator, ToggleState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/articles/{id}/like", post(like))
        .route("/api/articles/{id}/likes", get(likes))
        .route("/api/toggles/{target}/count", get(count))
}

#[derive(Debug, Serialize)]
pub struct LikeSummary {
    pub count: i64,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleCount {
    pub count: i64,
}

#[debug_handler(state = AppState)]
async fn like(
    State(toggles): State<ToggleCoordinator>,
    Actor(actor_id): Actor,
    Path(article_id): Path<String>,
) -> AppResult<Json<ToggleState>> {
    Ok(Json(toggles.toggle(&actor_id, &article_id).await?))
}

#[debug_handler(state = AppState)]
async fn likes(
    State(toggles): State<ToggleCoordinator>,
    actor: Option<Actor>,
    Path(article_id): Path<String>,
) -> AppResult<Json<LikeSummary>> {
    let count = toggles.count_active(&article_id).await?;
    let active = match actor {
        Some(Actor(actor_id)) => toggles.is_active(&actor_id, &article_id).await?,
        None => false,
    };
    Ok(Json(LikeSummary { count, active }))
}

#[debug_handler(state = AppState)]
async fn count(
    State(toggles): State<ToggleCoordinator>,
    Path(target): Path<String>,
) -> AppResult<Json<ToggleCount>> {
    Ok(Json(ToggleCount {
        count: toggles.count_active(&target).await?,
    }))
}
