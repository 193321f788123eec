//! Editor lease
//!
//! A cooperative single-writer lock with a time-bounded lease. Acquisition is a
//! non-blocking test-and-set: callers get an immediate answer and never queue.
//! Expiry is evaluated lazily by every method, so an expired lease and a free
//! lock look the same to all callers.

use std::time::Duration;

use tokio::time::Instant;

use crate::registry::ClientId;

/// An active lease on the editor lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Client currently holding the lock
    pub holder: ClientId,
    /// Instant after which the lease no longer counts
    pub expires_at: Instant,
}

impl Lease {
    /// A lease at exactly `expires_at` is still valid.
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Point-in-time view of the lock
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockStatus {
    /// Current holder, if any
    pub holder: Option<ClientId>,
    /// Whether the lock is held
    pub is_locked: bool,
}

impl LockStatus {
    /// Status of a free lock
    pub fn unlocked() -> Self {
        Self::default()
    }

    /// Status of a lock held by `holder`
    pub fn held_by(holder: ClientId) -> Self {
        Self {
            holder: Some(holder),
            is_locked: true,
        }
    }

    /// True when the lock is held by someone other than `client`
    pub fn blocks(&self, client: &ClientId) -> bool {
        self.is_locked && self.holder.as_ref() != Some(client)
    }
}

/// Answer to an acquire attempt, decided in one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The caller now holds the lease
    Acquired,
    /// Another client holds a live lease
    Held {
        /// Client holding the lease
        holder: ClientId,
    },
}

impl AcquireOutcome {
    /// Whether the lease was granted
    pub fn is_acquired(&self) -> bool {
        matches!(self, AcquireOutcome::Acquired)
    }
}

/// Lease state machine
///
/// Holds no clock of its own; every method takes `now` so the caller decides
/// which clock applies and the whole state can live inside one critical section.
#[derive(Debug, Clone, Default)]
pub struct EditorLock {
    lease: Option<Lease>,
}

impl EditorLock {
    /// Create a free lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the lease if it has run out. Returns the holder whose lease lapsed.
    pub fn expire_if_stale(&mut self, now: Instant) -> Option<ClientId> {
        if self.lease.as_ref().is_some_and(|lease| lease.is_expired(now)) {
            return self.lease.take().map(|lease| lease.holder);
        }
        None
    }

    /// Acquire or re-acquire the lock for `client`.
    ///
    /// Succeeds when the lock is free (or expired) or already held by `client`;
    /// either way the lease is extended to `now + ttl`. Fails without touching
    /// any state when another client holds a live lease, reporting that holder.
    pub fn try_acquire(
        &mut self,
        client: &ClientId,
        now: Instant,
        ttl: Duration,
    ) -> AcquireOutcome {
        if let Some(expired) = self.expire_if_stale(now) {
            tracing::debug!(client_id = %expired, "Editor lease expired");
        }

        if let Some(lease) = self.lease.as_ref().filter(|lease| lease.holder != *client) {
            return AcquireOutcome::Held {
                holder: lease.holder.clone(),
            };
        }

        self.lease = Some(Lease {
            holder: client.clone(),
            expires_at: now + ttl,
        });
        AcquireOutcome::Acquired
    }

    /// Release the lock if `client` holds a live lease.
    ///
    /// Returns true only when a live lease actually belonged to `client`. A
    /// release from anyone else is a no-op, and so is releasing a lease that
    /// already ran out: it is cleared but reported as not released.
    pub fn release(&mut self, client: &ClientId, now: Instant) -> bool {
        if self.expire_if_stale(now).is_some() {
            return false;
        }

        if self
            .lease
            .as_ref()
            .is_some_and(|lease| lease.holder == *client)
        {
            self.lease = None;
            return true;
        }
        false
    }

    /// Extend a live lease held by `client`.
    ///
    /// A lease that already ran out cannot be renewed, even by its last holder;
    /// the stale lease is cleared and the client must acquire again.
    pub fn renew(&mut self, client: &ClientId, now: Instant, ttl: Duration) -> bool {
        if self.expire_if_stale(now).is_some() {
            return false;
        }

        match &mut self.lease {
            Some(lease) if lease.holder == *client => {
                lease.expires_at = now + ttl;
                true
            }
            _ => false,
        }
    }

    /// Current status, lazily clearing an expired lease
    pub fn status(&mut self, now: Instant) -> LockStatus {
        self.expire_if_stale(now);
        match &self.lease {
            Some(lease) => LockStatus::held_by(lease.holder.clone()),
            None => LockStatus::unlocked(),
        }
    }

    /// Raw lease without expiry evaluation
    pub fn lease(&self) -> Option<&Lease> {
        self.lease.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(3);

    fn ids() -> (ClientId, ClientId) {
        (ClientId::from("alice"), ClientId::from("bob"))
    }

    #[test]
    fn test_acquire_free_lock() {
        let (a, _) = ids();
        let mut lock = EditorLock::new();
        let now = Instant::now();

        assert!(lock.try_acquire(&a, now, TTL).is_acquired());
        assert_eq!(lock.status(now), LockStatus::held_by(a.clone()));
        assert_eq!(lock.lease().unwrap().expires_at, now + TTL);
    }

    #[test]
    fn test_reacquire_extends_lease() {
        let (a, _) = ids();
        let mut lock = EditorLock::new();
        let t0 = Instant::now();

        assert!(lock.try_acquire(&a, t0, TTL).is_acquired());
        let t1 = t0 + Duration::from_secs(2);
        assert!(lock.try_acquire(&a, t1, TTL).is_acquired());
        assert_eq!(lock.lease().unwrap().expires_at, t1 + TTL);
    }

    #[test]
    fn test_contended_acquire_leaves_state_alone() {
        let (a, b) = ids();
        let mut lock = EditorLock::new();
        let t0 = Instant::now();

        assert!(lock.try_acquire(&a, t0, TTL).is_acquired());
        let before = lock.lease().cloned();

        assert!(!lock.try_acquire(&b, t0 + Duration::from_secs(1), TTL).is_acquired());
        assert_eq!(lock.lease().cloned(), before);
    }

    #[test]
    fn test_takeover_after_expiry() {
        let (a, b) = ids();
        let mut lock = EditorLock::new();
        let t0 = Instant::now();

        assert!(lock.try_acquire(&a, t0, TTL).is_acquired());
        // Exactly at the deadline the lease still holds
        assert!(!lock.try_acquire(&b, t0 + TTL, TTL).is_acquired());
        assert!(lock.try_acquire(&b, t0 + TTL + Duration::from_millis(1), TTL).is_acquired());
        assert_eq!(lock.lease().unwrap().holder, b);
    }

    #[test]
    fn test_release_by_non_holder_is_noop() {
        let (a, b) = ids();
        let mut lock = EditorLock::new();
        let now = Instant::now();

        lock.try_acquire(&a, now, TTL);
        assert!(!lock.release(&b, now));
        assert_eq!(lock.status(now).holder, Some(a.clone()));

        assert!(lock.release(&a, now));
        assert_eq!(lock.status(now), LockStatus::unlocked());
        assert!(!lock.release(&a, now));
    }

    #[test]
    fn test_contended_acquire_reports_holder() {
        let (a, b) = ids();
        let mut lock = EditorLock::new();
        let now = Instant::now();

        assert_eq!(lock.try_acquire(&a, now, TTL), AcquireOutcome::Acquired);
        assert_eq!(
            lock.try_acquire(&b, now, TTL),
            AcquireOutcome::Held { holder: a }
        );
    }

    #[test]
    fn test_release_of_lapsed_lease_is_not_a_release() {
        let (a, _) = ids();
        let mut lock = EditorLock::new();
        let t0 = Instant::now();

        lock.try_acquire(&a, t0, TTL);
        assert!(!lock.release(&a, t0 + TTL + Duration::from_millis(1)));
        assert!(lock.lease().is_none());
    }

    #[test]
    fn test_renew_live_lease() {
        let (a, b) = ids();
        let mut lock = EditorLock::new();
        let t0 = Instant::now();

        lock.try_acquire(&a, t0, TTL);
        let t1 = t0 + TTL;
        assert!(lock.renew(&a, t1, TTL));
        assert_eq!(lock.lease().unwrap().expires_at, t1 + TTL);
        assert!(!lock.renew(&b, t1, TTL));
    }

    #[test]
    fn test_renew_expired_lease_fails() {
        let (a, _) = ids();
        let mut lock = EditorLock::new();
        let t0 = Instant::now();

        lock.try_acquire(&a, t0, TTL);
        let late = t0 + TTL + Duration::from_millis(1);

        // Nominally still held until something checks expiry
        assert_eq!(lock.lease().unwrap().holder, a);
        assert!(!lock.renew(&a, late, TTL));
        assert!(lock.lease().is_none());
        assert!(!lock.status(late).is_locked);
    }

    #[test]
    fn test_status_expires_lazily() {
        let (a, _) = ids();
        let mut lock = EditorLock::new();
        let t0 = Instant::now();

        lock.try_acquire(&a, t0, TTL);
        assert!(lock.status(t0 + TTL).is_locked);
        assert_eq!(
            lock.status(t0 + TTL + Duration::from_millis(1)),
            LockStatus::unlocked()
        );
    }

    #[test]
    fn test_blocks() {
        let (a, b) = ids();

        assert!(!LockStatus::unlocked().blocks(&a));
        assert!(!LockStatus::held_by(a.clone()).blocks(&a));
        assert!(LockStatus::held_by(a).blocks(&b));
    }
}
