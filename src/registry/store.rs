//! Connection registry implementation

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::handle::ClientHandle;
use super::id::ClientId;

/// Map of connected clients to their outbound handles
///
/// Mutated only on connect and disconnect. Readers take a [`RegistrySnapshot`]
/// so fan-out never iterates the live map.
#[derive(Default)]
pub struct ConnectionRegistry {
    clients: RwLock<HashMap<ClientId, Arc<dyn ClientHandle>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, returning the new connection count
    pub async fn add(&self, id: ClientId, handle: Arc<dyn ClientHandle>) -> usize {
        let mut clients = self.clients.write().await;
        clients.insert(id, handle);
        clients.len()
    }

    /// Deregister a connection, returning the remaining connection count
    pub async fn remove(&self, id: &ClientId) -> usize {
        let mut clients = self.clients.write().await;
        clients.remove(id);
        clients.len()
    }

    /// Take an owned point-in-time copy of the mapping
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let clients = self.clients.read().await;
        RegistrySnapshot {
            entries: clients
                .iter()
                .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
                .collect(),
        }
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Whether no connections are registered
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Whether `id` is currently registered
    pub async fn contains(&self, id: &ClientId) -> bool {
        self.clients.read().await.contains_key(id)
    }
}

/// Immutable copy of the registry at one instant
///
/// Later adds and removes on the registry are not visible here.
pub struct RegistrySnapshot {
    entries: Vec<(ClientId, Arc<dyn ClientHandle>)>,
}

impl RegistrySnapshot {
    /// Iterate over all captured connections
    pub fn iter(&self) -> impl Iterator<Item = (&ClientId, &Arc<dyn ClientHandle>)> + '_ {
        self.entries.iter().map(|(id, handle)| (id, handle))
    }

    /// Number of captured connections
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the snapshot includes `id`
    pub fn contains(&self, id: &ClientId) -> bool {
        self.entries.iter().any(|(entry, _)| entry == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ChannelHandle;

    fn handle() -> Arc<dyn ClientHandle> {
        let (handle, _rx) = ChannelHandle::channel();
        Arc::new(handle)
    }

    #[tokio::test]
    async fn test_add_remove_counts() {
        let registry = ConnectionRegistry::new();
        let (a, b) = (ClientId::from("a"), ClientId::from("b"));

        assert_eq!(registry.add(a.clone(), handle()).await, 1);
        assert_eq!(registry.add(b.clone(), handle()).await, 2);
        assert!(registry.contains(&a).await);

        assert_eq!(registry.remove(&a).await, 1);
        // Removing twice is harmless
        assert_eq!(registry.remove(&a).await, 1);
        assert_eq!(registry.remove(&b).await, 0);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = ConnectionRegistry::new();
        let (a, b) = (ClientId::from("a"), ClientId::from("b"));
        registry.add(a.clone(), handle()).await;

        let snapshot = registry.snapshot().await;
        registry.add(b.clone(), handle()).await;
        registry.remove(&a).await;

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&a));
        assert!(!snapshot.contains(&b));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration() {
        let registry = Arc::new(ConnectionRegistry::new());

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let id = ClientId::from(format!("c{}", i));
                    registry.add(id.clone(), handle()).await;
                    let _ = registry.snapshot().await.len();
                    if i % 2 == 0 {
                        registry.remove(&id).await;
                    }
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.len().await, 16);
    }
}
