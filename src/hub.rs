//! Process-wide shared state

use std::sync::Arc;
use std::time::Duration;

use crate::broadcast::Broadcaster;
use crate::document::SharedDocument;
use crate::registry::ConnectionRegistry;

/// The document, the registry and a broadcaster over that registry
///
/// Cheap to clone; every session holds one.
#[derive(Clone)]
pub struct CollabHub {
    document: Arc<SharedDocument>,
    registry: Arc<ConnectionRegistry>,
    broadcaster: Broadcaster,
}

impl CollabHub {
    /// Create a hub with an empty document using `lock_timeout` leases
    pub fn new(lock_timeout: Duration) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            document: Arc::new(SharedDocument::with_lock_timeout(lock_timeout)),
            broadcaster: Broadcaster::new(Arc::clone(&registry)),
            registry,
        }
    }

    /// The shared document
    pub fn document(&self) -> &Arc<SharedDocument> {
        &self.document
    }

    /// The connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Broadcaster over the registry
    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }
}

impl Default for CollabHub {
    fn default() -> Self {
        Self::new(crate::document::DEFAULT_LOCK_TIMEOUT)
    }
}
