//! Warming Lock Module
//!
//! Non-blocking per-key mutual exclusion for cache-warming workers. At most
//! one computation per (tenant, metric) key is in flight; every other caller
//! sees the key as held and skips its own redundant work.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::debug;

/// Builds the lock key for one tenant's metric.
pub fn warming_key(tenant_id: &str, metric: &str) -> String {
    format!("{}:{}", tenant_id, metric)
}

// == Warming Lock ==
/// Set of keys currently being warmed.
#[derive(Debug, Default)]
pub struct WarmingLock {
    held: Mutex<HashSet<String>>,
}

impl WarmingLock {
    pub fn new() -> Self {
        Self::default()
    }

    // == Try Lock ==
    /// Marks `key` as held.
    ///
    /// Returns false immediately when another caller holds it; never waits.
    pub fn try_lock(&self, key: &str) -> bool {
        let acquired = self.held.lock().insert(key.to_string());
        if !acquired {
            debug!("Warming already in progress for '{}'", key);
        }
        acquired
    }

    // == Unlock ==
    /// Releases `key`. Releasing a key nobody holds is a no-op.
    pub fn unlock(&self, key: &str) {
        self.held.lock().remove(key);
    }

    /// Like [`try_lock`](Self::try_lock) but releases on drop.
    pub fn try_acquire(&self, key: &str) -> Option<WarmingGuard<'_>> {
        if self.try_lock(key) {
            Some(WarmingGuard {
                lock: self,
                key: key.to_string(),
            })
        } else {
            None
        }
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.held.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.lock().is_empty()
    }
}

// == Warming Guard ==
/// Releases its key when dropped, including on early return or panic.
#[derive(Debug)]
pub struct WarmingGuard<'a> {
    lock: &'a WarmingLock,
    key: String,
}

impl WarmingGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for WarmingGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_try_lock_is_exclusive() {
        let lock = WarmingLock::new();
        assert!(lock.try_lock("acme:lead_metrics"));
        assert!(!lock.try_lock("acme:lead_metrics"));
        assert!(lock.try_lock("acme:dashboard"));
        assert_eq!(lock.len(), 2);
    }

    #[test]
    fn test_unlock_releases() {
        let lock = WarmingLock::new();
        assert!(lock.try_lock("k"));
        lock.unlock("k");
        assert!(!lock.is_locked("k"));
        assert!(lock.try_lock("k"));
    }

    #[test]
    fn test_unlock_unheld_key_is_noop() {
        let lock = WarmingLock::new();
        lock.unlock("never-held");
        assert!(lock.is_empty());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = WarmingLock::new();
        {
            let guard = lock.try_acquire("acme:dashboard").unwrap();
            assert_eq!(guard.key(), "acme:dashboard");
            assert!(lock.try_acquire("acme:dashboard").is_none());
        }
        assert!(lock.try_acquire("acme:dashboard").is_some());
    }

    #[test]
    fn test_warming_key_format() {
        assert_eq!(warming_key("acme", "lead_metrics"), "acme:lead_metrics");
    }

    #[test]
    fn test_concurrent_try_lock_single_winner() {
        let lock = Arc::new(WarmingLock::new());
        let barrier = Arc::new(Barrier::new(16));
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let barrier = Arc::clone(&barrier);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    barrier.wait();
                    if lock.try_lock("acme:epinet") {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
