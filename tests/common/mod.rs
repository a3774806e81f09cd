#![allow(dead_code)]

use starhub::{store::Store, AppState, Config};

pub async fn state() -> AppState {
    let store = Store::connect("sqlite::memory:", 1).await.unwrap();
    store.migrate().await.unwrap();
    AppState::new(store, Config::default())
}

/// Makes inserts of messages with exactly `content` fail.
pub async fn reject_content(store: &Store, content: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER reject_content BEFORE INSERT ON messages
         WHEN NEW.content = '{}'
         BEGIN SELECT RAISE(ABORT, 'rejected by trigger'); END",
        content.replace('\'', "''")
    ))
    .execute(store.pool())
    .await
    .unwrap();
}
