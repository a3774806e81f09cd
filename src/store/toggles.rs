use time::OffsetDateTime;

use super::{to_nanos, Store};

/// One active like. Presence of the row is the whole state.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ToggleRow {
    pub id: i64,
    pub actor_id: String,
    pub target_id: String,
}

impl Store {
    pub async fn find_toggle(&self, actor_id: &str, target_id: &str) -> Result<Option<ToggleRow>, sqlx::Error> {
        sqlx::query_as("SELECT id,actor_id,target_id FROM likes WHERE actor_id=? AND target_id=?")
            .bind(actor_id)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Inserts the row unless one already exists for the pair.
    ///
    /// Returns `false` when another writer got there first.
    pub async fn insert_toggle(&self, actor_id: &str, target_id: &str) -> Result<bool, sqlx::Error> {
        let created_at = to_nanos(OffsetDateTime::now_utc())?;
        let result = sqlx::query(
            "INSERT INTO likes (actor_id,target_id,created_at) VALUES (?,?,?)
             ON CONFLICT (actor_id,target_id) DO NOTHING",
        )
        .bind(actor_id)
        .bind(target_id)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deleting a row that is already gone is not an error.
    pub async fn delete_toggle(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM likes WHERE id=?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_toggles(&self, target_id: &str) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM likes WHERE target_id=?")
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
