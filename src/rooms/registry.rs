//! Which live connections are in which rooms. Process-local, empty on boot.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tokio::sync::RwLock;

use super::connection::{ClientConnection, ConnectionId};

#[derive(Default)]
struct Membership {
    rooms: HashMap<String, HashMap<ConnectionId, Arc<ClientConnection>>>,
    joined: HashMap<ConnectionId, HashSet<String>>,
}

#[derive(Default)]
pub struct RoomRegistry {
    inner: RwLock<Membership>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn` to `room`. Returns `false` if it was already a member.
    pub async fn join(&self, conn: &Arc<ClientConnection>, room: &str) -> bool {
        let mut inner = self.inner.write().await;
        let added = inner
            .rooms
            .entry(room.to_owned())
            .or_default()
            .insert(conn.id, Arc::clone(conn))
            .is_none();
        if added {
            inner.joined.entry(conn.id).or_default().insert(room.to_owned());
        }
        added
    }

    /// Removes `id` from `room`. Returns `false` if it was not a member.
    pub async fn leave(&self, id: ConnectionId, room: &str) -> bool {
        let mut inner = self.inner.write().await;
        let removed = match inner.rooms.get_mut(room) {
            Some(members) => {
                let removed = members.remove(&id).is_some();
                if members.is_empty() {
                    inner.rooms.remove(room);
                }
                removed
            }
            None => false,
        };
        if let Some(rooms) = inner.joined.get_mut(&id) {
            rooms.remove(room);
            if rooms.is_empty() {
                inner.joined.remove(&id);
            }
        }
        removed
    }

    /// Drops every membership of `id` and returns the rooms it was in.
    pub async fn leave_all(&self, id: ConnectionId) -> Vec<String> {
        let mut inner = self.inner.write().await;
        let Some(rooms) = inner.joined.remove(&id) else {
            return Vec::new();
        };
        for room in &rooms {
            if let Some(members) = inner.rooms.get_mut(room) {
                members.remove(&id);
                if members.is_empty() {
                    inner.rooms.remove(room);
                }
            }
        }
        rooms.into_iter().collect()
    }

    /// Snapshot of the connections currently in `room`.
    pub async fn members_of(&self, room: &str) -> Vec<Arc<ClientConnection>> {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn member_ids(&self, room: &str) -> HashSet<ConnectionId> {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }

    pub async fn rooms_of(&self, id: ConnectionId) -> HashSet<String> {
        self.inner.read().await.joined.get(&id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Arc<ClientConnection> {
        ClientConnection::channel(8).0
    }

    #[tokio::test]
    async fn join_twice_keeps_one_entry() {
        let registry = RoomRegistry::new();
        let a = conn();

        assert!(registry.join(&a, "general").await);
        assert!(!registry.join(&a, "general").await);

        assert_eq!(registry.members_of("general").await.len(), 1);
        assert_eq!(registry.rooms_of(a.id).await.len(), 1);
    }

    #[tokio::test]
    async fn connection_can_sit_in_many_rooms() {
        let registry = RoomRegistry::new();
        let a = conn();
        registry.join(&a, "general").await;
        registry.join(&a, "random").await;

        assert!(registry.member_ids("general").await.contains(&a.id));
        assert!(registry.member_ids("random").await.contains(&a.id));

        assert!(registry.leave(a.id, "general").await);
        assert!(!registry.leave(a.id, "general").await);
        assert!(registry.member_ids("general").await.is_empty());
        assert_eq!(registry.rooms_of(a.id).await, HashSet::from(["random".to_owned()]));
    }

    #[tokio::test]
    async fn leave_all_clears_every_room() {
        let registry = RoomRegistry::new();
        let (a, b) = (conn(), conn());
        for room in ["general", "random", "dev"] {
            registry.join(&a, room).await;
        }
        registry.join(&b, "general").await;

        let mut left = registry.leave_all(a.id).await;
        left.sort();
        assert_eq!(left, ["dev", "general", "random"]);

        for room in ["general", "random", "dev"] {
            assert!(!registry.member_ids(room).await.contains(&a.id));
        }
        assert!(registry.member_ids("general").await.contains(&b.id));
        assert!(registry.rooms_of(a.id).await.is_empty());

        assert!(registry.leave_all(a.id).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_room_has_no_members() {
        let registry = RoomRegistry::new();
        assert!(registry.members_of("nowhere").await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_joins_are_not_lost() {
        let registry = Arc::new(RoomRegistry::new());
        let conns: Vec<_> = (0..32).map(|_| conn()).collect();

        let tasks: Vec<_> = conns
            .iter()
            .cloned()
            .map(|c| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.join(&c, "general").await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(registry.member_ids("general").await.len(), conns.len());
    }
}
