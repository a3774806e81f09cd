use serde::{ser::SerializeStruct, Serialize, Serializer};
use time::OffsetDateTime;

use super::{from_nanos, to_nanos, Store};
use crate::rooms::Sender;

/// A message accepted for persistence but not yet written.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room: String,
    pub sender: Sender,
    pub content: String,
    pub created_at: OffsetDateTime,
}

/// A persisted chat message. Never updated after insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub room: String,
    pub sender: Sender,
    pub content: String,
    pub created_at: OffsetDateTime,
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Message", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("room", &self.room)?;
        s.serialize_field("sender", self.sender.label())?;
        s.serialize_field("anonymous", &self.sender.is_anonymous())?;
        s.serialize_field("content", &self.content)?;
        s.serialize_field("created_at", &Rfc3339(self.created_at))?;
        s.end()
    }
}

struct Rfc3339(OffsetDateTime);

impl Serialize for Rfc3339 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        time::serde::rfc3339::serialize(&self.0, serializer)
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room: String,
    sender: Option<String>,
    content: String,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = sqlx::Error;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            room: row.room,
            sender: Sender::from_column(row.sender),
            content: row.content,
            created_at: from_nanos(row.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomEntry {
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Store {
    /// Writes `msg`, registering its room in the catalogue on first use.
    pub async fn insert_message(&self, msg: NewMessage) -> Result<Message, sqlx::Error> {
        let created_at = to_nanos(msg.created_at)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO rooms (name,created_at) VALUES (?,?)")
            .bind(&msg.room)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

        let id = sqlx::query("INSERT INTO messages (room,sender,content,created_at) VALUES (?,?,?,?)")
            .bind(&msg.room)
            .bind(msg.sender.as_column())
            .bind(&msg.content)
            .bind(created_at)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        tx.commit().await?;

        Ok(Message {
            id,
            room: msg.room,
            sender: msg.sender,
            content: msg.content,
            created_at: msg.created_at,
        })
    }

    /// Room history, oldest first. Equal timestamps keep insertion order.
    pub async fn query_messages(&self, room: &str) -> Result<Vec<Message>, sqlx::Error> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id,room,sender,content,created_at FROM messages WHERE room=? ORDER BY created_at ASC, id ASC",
        )
        .bind(room)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    pub async fn rooms(&self) -> Result<Vec<RoomEntry>, sqlx::Error> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT name,created_at FROM rooms ORDER BY created_at ASC, name ASC")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(name, created_at)| Ok(RoomEntry { name, created_at: from_nanos(created_at)? }))
            .collect()
    }
}
