//! Like/unlike as an existence flip of one row per (actor, target).

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::{require_non_empty, CoreResult},
    store::Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleState {
    pub active: bool,
}

#[derive(Clone)]
pub struct ToggleCoordinator {
    store: Store,
}

impl ToggleCoordinator {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Deletes the row if present, inserts it if absent, and reports the new state.
    ///
    /// The lookup and the write are separate statements. Two racing toggles
    /// from one actor can both see the row missing; the unique index lets only
    /// one insert land, so both callers end up reporting `active` and the
    /// table still holds a single row. Two racing deletes are harmless.
    pub async fn toggle(&self, actor_id: &str, target_id: &str) -> CoreResult<ToggleState> {
        require_non_empty("actor", actor_id)?;
        require_non_empty("target", target_id)?;

        let active = match self.store.find_toggle(actor_id, target_id).await? {
            Some(row) => {
                self.store.delete_toggle(row.id).await?;
                false
            }
            None => {
                if !self.store.insert_toggle(actor_id, target_id).await? {
                    debug!(actor_id, target_id, "concurrent toggle already inserted row");
                }
                true
            }
        };

        info!(actor_id, target_id, active, "toggled");
        Ok(ToggleState { active })
    }

    pub async fn is_active(&self, actor_id: &str, target_id: &str) -> CoreResult<bool> {
        Ok(self.store.find_toggle(actor_id, target_id).await?.is_some())
    }

    /// Counted from the rows on every call.
    pub async fn count_active(&self, target_id: &str) -> CoreResult<i64> {
        require_non_empty("target", target_id)?;
        Ok(self.store.count_toggles(target_id).await?)
    }
}
