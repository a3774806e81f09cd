mod messages;
mod toggles;

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use time::OffsetDateTime;

pub use messages::{Message, NewMessage, RoomEntry};
pub use toggles::ToggleRow;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS rooms (
        name TEXT PRIMARY KEY NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        room TEXT NOT NULL,
        sender TEXT,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS messages_room_created_at ON messages (room, created_at)",
    "CREATE TABLE IF NOT EXISTS likes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        actor_id TEXT NOT NULL,
        target_id TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS likes_actor_target ON likes (actor_id, target_id)",
    "CREATE INDEX IF NOT EXISTS likes_target ON likes (target_id)",
];

// Timestamps are stored as unix nanoseconds so that SQL ordering is numeric.
pub(crate) fn to_nanos(at: OffsetDateTime) -> Result<i64, sqlx::Error> {
    i64::try_from(at.unix_timestamp_nanos()).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

pub(crate) fn from_nanos(nanos: i64) -> Result<OffsetDateTime, sqlx::Error> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos)).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `url`, creating the database file when missing.
    ///
    /// In-memory databases live only as long as their connection, so they get
    /// a single connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let mut pool = SqlitePoolOptions::new().max_connections(max_connections);
        if url.contains(":memory:") {
            pool = pool
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        Ok(Self::new(pool.connect_with(options).await?))
    }

    /// Creates tables and indexes that do not exist yet.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Store;

    pub(crate) async fn memory_store() -> Store {
        let store = Store::connect("sqlite::memory:", 1).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    /// Makes every insert of a message with exactly `content` fail.
    pub(crate) async fn reject_content(store: &Store, content: &str) {
        let trigger = format!(
            "CREATE TRIGGER reject_content BEFORE INSERT ON messages
             WHEN NEW.content = '{}'
             BEGIN SELECT RAISE(ABORT, 'rejected by trigger'); END",
            content.replace('\'', "''")
        );
        sqlx::query(&trigger).execute(store.pool()).await.unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testing::memory_store;

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = memory_store().await;
        store.migrate().await.unwrap();
        assert!(store.rooms().await.unwrap().is_empty());
    }
}
