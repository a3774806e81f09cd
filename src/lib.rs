pub mod appresult;
pub mod auth;
pub mod config;
pub mod error;
pub mod likes;
pub mod rooms;
pub mod store;

use std::sync::Arc;

use axum::{extract::FromRef, http::HeaderValue, Router};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;

use likes::ToggleCoordinator;
use rooms::{ChatService, RoomRegistry};
use store::Store;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Store,
    pub chat: Arc<ChatService>,
    pub toggles: ToggleCoordinator,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires a fresh, empty room registry to `store`.
    pub fn new(store: Store, config: Config) -> Self {
        let registry = Arc::new(RoomRegistry::new());
        Self {
            chat: Arc::new(ChatService::new(store.clone(), registry)),
            toggles: ToggleCoordinator::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let cors = match state.config.cors_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new().allow_origin(origin),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "ignoring invalid CORS_ORIGIN");
            CorsLayer::new().allow_origin(Any)
        }
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    Router::new()
        .merge(rooms::router())
        .merge(likes::router())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
