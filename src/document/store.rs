//! Shared document store
//!
//! The single authoritative document. Content, version and editor lease live
//! behind one mutex so every decision is made against one consistent snapshot.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use super::lock::{AcquireOutcome, EditorLock, LockStatus};
use crate::registry::ClientId;

/// Default editor lease duration
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(3);

/// Content and version read as one pair
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentSnapshot {
    /// Full document text
    pub content: String,
    /// Number of replacements applied so far
    pub version: u64,
}

/// Content, version and lock status taken from the same critical section
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentView {
    /// Document content and version
    pub document: DocumentSnapshot,
    /// Lock status at the same instant
    pub lock: LockStatus,
}

/// Result of an authorized edit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit replaced the content; the view is the state right after it
    Applied(DocumentView),
    /// Another client holds the lock; nothing changed
    Locked {
        /// Client holding the lock
        holder: ClientId,
    },
}

struct DocumentState {
    content: String,
    version: u64,
    lock: EditorLock,
}

/// Shared document with a leased editor lock
///
/// Every operation runs as one critical section. No operation waits on another
/// client's lease: lock calls answer immediately with true or false.
pub struct SharedDocument {
    state: Mutex<DocumentState>,
    lock_timeout: Duration,
}

impl SharedDocument {
    /// Create an empty document with the default lease duration
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty document with a custom lease duration
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(DocumentState {
                content: String::new(),
                version: 0,
                lock: EditorLock::new(),
            }),
            lock_timeout,
        }
    }

    /// Lease duration applied to every acquire and renew
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Read content and version atomically
    pub async fn read(&self) -> DocumentSnapshot {
        let state = self.state.lock().await;
        DocumentSnapshot {
            content: state.content.clone(),
            version: state.version,
        }
    }

    /// Replace the whole content, returning the new version.
    ///
    /// Unconditional: authorization is the session's job. Use [`try_edit`]
    /// for the lock-checked path.
    ///
    /// [`try_edit`]: SharedDocument::try_edit
    pub async fn replace(&self, content: String) -> u64 {
        let mut state = self.state.lock().await;
        state.content = content;
        state.version += 1;
        state.version
    }

    /// Replace the content unless another client holds a live lease.
    ///
    /// The lock check and the write happen in the same critical section, so the
    /// lease cannot change hands between them.
    pub async fn try_edit(&self, client: &ClientId, content: String) -> EditOutcome {
        let mut state = self.state.lock().await;
        let lock = state.lock.status(Instant::now());

        match &lock.holder {
            Some(holder) if holder != client => {
                return EditOutcome::Locked {
                    holder: holder.clone(),
                };
            }
            _ => {}
        }

        state.content = content;
        state.version += 1;

        EditOutcome::Applied(DocumentView {
            document: DocumentSnapshot {
                content: state.content.clone(),
                version: state.version,
            },
            lock,
        })
    }

    /// Content, version and lock status in one read
    pub async fn view(&self) -> DocumentView {
        let mut state = self.state.lock().await;
        let lock = state.lock.status(Instant::now());
        DocumentView {
            document: DocumentSnapshot {
                content: state.content.clone(),
                version: state.version,
            },
            lock,
        }
    }

    /// Try to take (or re-take) the editor lock for `client`.
    ///
    /// On refusal the outcome names the holder seen in the same critical section.
    pub async fn try_acquire_lock(&self, client: &ClientId) -> AcquireOutcome {
        let mut state = self.state.lock().await;
        let outcome = state
            .lock
            .try_acquire(client, Instant::now(), self.lock_timeout);

        if outcome.is_acquired() {
            tracing::debug!(client_id = %client, "Editor lock granted");
        }
        outcome
    }

    /// Release the editor lock if `client` holds a live lease.
    ///
    /// Returns whether the lock was actually released. A lease that already
    /// lapsed counts as free, so releasing it returns false.
    pub async fn release_lock(&self, client: &ClientId) -> bool {
        let mut state = self.state.lock().await;
        let released = state.lock.release(client, Instant::now());

        if released {
            tracing::debug!(client_id = %client, "Editor lock released");
        }
        released
    }

    /// Extend the lease of a current, unexpired holder
    pub async fn renew_lock(&self, client: &ClientId) -> bool {
        let mut state = self.state.lock().await;
        state.lock.renew(client, Instant::now(), self.lock_timeout)
    }

    /// Report who holds the lock, expiring a stale lease first
    pub async fn lock_status(&self) -> LockStatus {
        let mut state = self.state.lock().await;
        state.lock.status(Instant::now())
    }
}

impl Default for SharedDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;

    fn client(name: &str) -> ClientId {
        ClientId::from(name)
    }

    #[tokio::test]
    async fn test_versions_are_gapless() {
        let doc = SharedDocument::new();
        assert_eq!(doc.read().await, DocumentSnapshot::default());

        for n in 1..=5u64 {
            assert_eq!(doc.replace(format!("rev {}", n)).await, n);
        }

        let snapshot = doc.read().await;
        assert_eq!(snapshot.version, 5);
        assert_eq!(snapshot.content, "rev 5");
    }

    #[tokio::test]
    async fn test_replace_ignores_lock() {
        let doc = SharedDocument::new();
        assert!(doc.try_acquire_lock(&client("a")).await.is_acquired());

        assert_eq!(doc.replace("anyone".into()).await, 1);
        assert_eq!(doc.read().await.content, "anyone");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replace_never_tears() {
        let doc = Arc::new(SharedDocument::new());
        let writers = 8;
        let per_writer = 50;

        let mut tasks = Vec::new();
        for w in 0..writers {
            let doc = Arc::clone(&doc);
            tasks.push(tokio::spawn(async move {
                let mut written = Vec::new();
                for i in 0..per_writer {
                    let content = format!("w{}-{}", w, i);
                    let version = doc.replace(content.clone()).await;
                    written.push((version, content));
                }
                written
            }));
        }

        let reader = {
            let doc = Arc::clone(&doc);
            tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..200 {
                    seen.push(doc.read().await);
                    tokio::task::yield_now().await;
                }
                seen
            })
        };

        let mut by_version = HashMap::new();
        by_version.insert(0u64, String::new());
        for task in tasks {
            for (version, content) in task.await.unwrap() {
                assert!(by_version.insert(version, content).is_none());
            }
        }

        let total = (writers * per_writer) as u64;
        assert_eq!(doc.read().await.version, total);
        assert_eq!(by_version.len() as u64, total + 1);

        for snapshot in reader.await.unwrap() {
            assert_eq!(by_version[&snapshot.version], snapshot.content);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reacquire_is_idempotent() {
        let doc = SharedDocument::new();
        let a = client("a");

        assert!(doc.try_acquire_lock(&a).await.is_acquired());
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(doc.try_acquire_lock(&a).await.is_acquired());

        // The first lease would have lapsed here; the re-acquire extended it
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(doc.lock_status().await, LockStatus::held_by(a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_client_is_refused() {
        let doc = SharedDocument::new();
        let (a, b) = (client("a"), client("b"));

        assert!(doc.try_acquire_lock(&a).await.is_acquired());
        assert!(!doc.try_acquire_lock(&b).await.is_acquired());
        assert_eq!(doc.lock_status().await, LockStatus::held_by(a));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lease_expires_without_release() {
        let doc = SharedDocument::new();
        let (a, b) = (client("a"), client("b"));

        assert!(doc.try_acquire_lock(&a).await.is_acquired());
        tokio::time::advance(DEFAULT_LOCK_TIMEOUT + Duration::from_millis(1)).await;

        assert!(doc.try_acquire_lock(&b).await.is_acquired());
        assert_eq!(doc.lock_status().await, LockStatus::held_by(b));
    }

    #[tokio::test(start_paused = true)]
    async fn test_renew_after_expiry_fails() {
        let doc = SharedDocument::with_lock_timeout(Duration::from_millis(500));
        let a = client("a");

        assert!(doc.try_acquire_lock(&a).await.is_acquired());
        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(doc.renew_lock(&a).await);

        tokio::time::advance(Duration::from_millis(501)).await;
        assert!(!doc.renew_lock(&a).await);
        assert!(!doc.lock_status().await.is_locked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_after_lease_lapsed_is_noop() {
        let doc = SharedDocument::new();
        let a = client("a");

        assert!(doc.try_acquire_lock(&a).await.is_acquired());
        tokio::time::advance(Duration::from_secs(4)).await;

        assert!(!doc.release_lock(&a).await);
        assert_eq!(doc.lock_status().await, LockStatus::unlocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refusal_names_current_holder() {
        let doc = SharedDocument::new();
        let (a, b) = (client("a"), client("b"));

        assert!(doc.try_acquire_lock(&a).await.is_acquired());
        assert_eq!(
            doc.try_acquire_lock(&b).await,
            AcquireOutcome::Held { holder: a }
        );
    }

    #[tokio::test]
    async fn test_release_by_other_client_is_noop() {
        let doc = SharedDocument::new();
        let (a, b) = (client("a"), client("b"));

        assert!(doc.try_acquire_lock(&a).await.is_acquired());
        assert!(!doc.release_lock(&b).await);
        assert_eq!(doc.lock_status().await.holder, Some(a.clone()));

        assert!(doc.release_lock(&a).await);
        assert_eq!(doc.lock_status().await, LockStatus::unlocked());
    }

    #[tokio::test]
    async fn test_try_edit_respects_lock() {
        let doc = SharedDocument::new();
        let (a, b) = (client("a"), client("b"));

        assert!(doc.try_acquire_lock(&a).await.is_acquired());

        let refused = doc.try_edit(&b, "from b".into()).await;
        assert_eq!(refused, EditOutcome::Locked { holder: a.clone() });
        assert_eq!(doc.read().await, DocumentSnapshot::default());

        match doc.try_edit(&a, "from a".into()).await {
            EditOutcome::Applied(view) => {
                assert_eq!(view.document.version, 1);
                assert_eq!(view.document.content, "from a");
                assert_eq!(view.lock, LockStatus::held_by(a));
            }
            other => panic!("expected applied edit, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_edit_after_lease_lapses() {
        let doc = SharedDocument::new();
        let (a, b) = (client("a"), client("b"));

        assert!(doc.try_acquire_lock(&a).await.is_acquired());
        tokio::time::advance(DEFAULT_LOCK_TIMEOUT + Duration::from_secs(1)).await;

        assert!(matches!(
            doc.try_edit(&b, "late".into()).await,
            EditOutcome::Applied(_)
        ));
        assert!(!doc.lock_status().await.is_locked);
    }
}
