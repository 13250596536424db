//! Nonce count tracking for replay protection.
//!
//! The tracker remembers, per nonce, the highest nonce count accepted so far.
//! A request is accepted only if its count is strictly greater, and the
//! check and the update happen as one atomic step per nonce.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::task::JoinHandle;
use tracing::debug;

/// Errors reported by a nonce store.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The store could not be reached.
    #[error("nonce store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Replay-protection store mapping a nonce to its last accepted count.
///
/// Implementations must make [`try_add_entry`](Self::try_add_entry) atomic:
/// among concurrent calls with the same nonce and count, at most one may
/// return `true`.
#[async_trait]
pub trait NonceTracker: Send + Sync {
    /// The last accepted count for `nonce`, if the nonce is tracked.
    async fn try_get_entry(&self, nonce: &str) -> Result<Option<u64>, TrackerError>;

    /// Record `counter` for `nonce` if it is greater than the stored count,
    /// or if the nonce is not tracked. Returns whether it was recorded.
    async fn try_add_entry(&self, nonce: &str, counter: u64) -> Result<bool, TrackerError>;
}

#[derive(Debug, Clone, Copy)]
struct TrackedNonce {
    counter: u64,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl TrackedNonce {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-process tracker backed by a sharded concurrent map.
///
/// Entries expire `ttl` after their last update. Expired entries are ignored
/// on lookup and removed by [`purge_expired`](Self::purge_expired), which
/// [`spawn_purge_task`](Self::spawn_purge_task) runs periodically.
#[derive(Debug)]
pub struct InMemoryNonceTracker {
    entries: DashMap<String, TrackedNonce>,
    ttl: Duration,
}

impl InMemoryNonceTracker {
    /// Create a tracker whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of tracked nonces, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no nonces are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove expired entries and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired nonces");
        }
        removed
    }

    /// Purge expired entries every `interval` on the tokio runtime.
    ///
    /// The task holds only a weak reference and ends once the tracker is dropped.
    pub fn spawn_purge_task(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let tracker: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(tracker) = tracker.upgrade() else {
                    break;
                };
                tracker.purge_expired();
            }
        })
    }

    fn record(&self, nonce: &str, counter: u64) -> bool {
        let now = Instant::now();
        let tracked = TrackedNonce {
            counter,
            expires_at: now.checked_add(self.ttl),
        };
        match self.entries.entry(nonce.to_owned()) {
            Entry::Vacant(e) => {
                e.insert(tracked);
                true
            }
            Entry::Occupied(mut e) => {
                let current = *e.get();
                if !current.is_live(now) || counter > current.counter {
                    e.insert(tracked);
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[async_trait]
impl NonceTracker for InMemoryNonceTracker {
    async fn try_get_entry(&self, nonce: &str) -> Result<Option<u64>, TrackerError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(nonce)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.counter))
    }

    async fn try_add_entry(&self, nonce: &str, counter: u64) -> Result<bool, TrackerError> {
        Ok(self.record(nonce, counter))
    }
}
