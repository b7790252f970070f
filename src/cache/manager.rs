//! Cache Manager Module
//!
//! Owns every tenant's [`TenantCacheBundle`], creates them lazily and keeps
//! the tenant count and estimated entry count bounded by evicting the
//! least-recently-accessed tenants.
//!
//! Lock order is manager first, then per-store. Store modules never see
//! the manager, so a store lock can never be held while this one is taken.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::analytics::{AnalyticsReader, AnalyticsWriter};
use crate::cache::bundle::{TenantCacheBundle, TenantStats};
use crate::cache::clock::{Clock, SystemClock};
use crate::cache::stats::CacheStats;
use crate::cache::warming::WarmingLock;
use crate::config::{CacheConfig, CapacityPolicy};
use crate::error::{CacheError, Result};
use crate::models::analytics::cutoff_hour_key;

type TenantMap = HashMap<String, Arc<TenantCacheBundle>>;

/// Manager-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerStats {
    pub tenant_count: usize,
    pub max_tenants: usize,
    pub total_entries: usize,
    pub max_estimated_entries: usize,
    pub tenant_evictions: u64,
    pub warming_in_progress: usize,
    /// Counters of every store of every tenant summed
    pub combined: CacheStats,
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    pub tenants_swept: usize,
    pub expired_removed: usize,
    pub bins_purged: usize,
    /// Bins with an hour key before this were purged; `None` purges nothing
    pub cutoff_hour_key: Option<String>,
}

impl SweepReport {
    pub fn total_removed(&self) -> usize {
        self.expired_removed + self.bins_purged
    }
}

// == Cache Manager ==
/// Multi-tenant cache. Build one per process and share it by `Arc`.
#[derive(Debug)]
pub struct CacheManager {
    tenants: RwLock<TenantMap>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    warming: WarmingLock,
    tenant_evictions: AtomicU64,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager on the wall clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a manager whose stores all read time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            tenants: RwLock::new(HashMap::new()),
            config,
            clock,
            warming: WarmingLock::new(),
            tenant_evictions: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // == Tenant Lifecycle ==
    /// Returns the tenant's bundle, creating it if absent.
    ///
    /// Takes the shared lock first and only escalates to the exclusive lock
    /// on a miss, re-checking before creating. New tenants may evict the
    /// least-recently-accessed ones to stay within bounds.
    ///
    /// # Errors
    /// `CapacityExceeded` under [`CapacityPolicy::Strict`] when eviction
    /// cannot restore the bounds.
    pub fn ensure_tenant(&self, tenant_id: &str) -> Result<Arc<TenantCacheBundle>> {
        let existing = self.tenants.read().get(tenant_id).cloned();
        if let Some(bundle) = existing {
            bundle.touch();
            return Ok(bundle);
        }

        let mut tenants = self.tenants.write();
        if let Some(bundle) = tenants.get(tenant_id) {
            bundle.touch();
            return Ok(bundle.clone());
        }

        self.make_room(&mut tenants, tenant_id)?;

        let bundle = Arc::new(TenantCacheBundle::new(
            tenant_id,
            &self.config,
            self.clock.clone(),
        ));
        tenants.insert(tenant_id.to_string(), bundle.clone());
        info!("Initialized cache for tenant '{}'", tenant_id);
        Ok(bundle)
    }

    /// Returns the tenant's bundle without creating it.
    ///
    /// For write paths where a missing tenant means a startup ordering
    /// mistake rather than a cold cache.
    pub fn existing_tenant(&self, tenant_id: &str) -> Result<Arc<TenantCacheBundle>> {
        let bundle = self
            .tenants
            .read()
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| CacheError::TenantNotInitialized(tenant_id.to_string()))?;
        bundle.touch();
        Ok(bundle)
    }

    pub fn has_tenant(&self, tenant_id: &str) -> bool {
        self.tenants.read().contains_key(tenant_id)
    }

    /// Evicts least-recently-accessed tenants until one more fits.
    /// Caller holds the exclusive manager lock.
    fn make_room(&self, tenants: &mut TenantMap, incoming: &str) -> Result<()> {
        loop {
            let estimated: usize = tenants.values().map(|b| b.entry_count()).sum();
            let reason = if tenants.len() >= self.config.max_tenants {
                "tenant limit reached"
            } else if estimated >= self.config.max_estimated_entries {
                "estimated entry limit reached"
            } else {
                return Ok(());
            };

            let victim = tenants
                .values()
                .min_by_key(|b| b.last_accessed_millis())
                .map(|b| b.tenant_id().to_string());

            let Some(victim) = victim else {
                return self.capacity_still_exceeded(incoming, tenants.len(), estimated);
            };
            tenants.remove(&victim);
            self.tenant_evictions.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Evicted tenant '{}' to make room for '{}': {}",
                victim, incoming, reason
            );
        }
    }

    fn capacity_still_exceeded(&self, incoming: &str, count: usize, estimated: usize) -> Result<()> {
        match self.config.capacity_policy {
            CapacityPolicy::Overcommit => {
                warn!(
                    "Capacity still exceeded after eviction ({} tenants, ~{} entries); creating '{}' anyway",
                    count, estimated, incoming
                );
                Ok(())
            }
            CapacityPolicy::Strict => Err(CacheError::CapacityExceeded(format!(
                "cannot create tenant '{}': {} tenants, ~{} entries held",
                incoming, count, estimated
            ))),
        }
    }

    /// Drops one tenant's bundle. Returns true if it existed.
    pub fn invalidate_tenant(&self, tenant_id: &str) -> bool {
        let removed = self.tenants.write().remove(tenant_id).is_some();
        if removed {
            info!("Invalidated cache for tenant '{}'", tenant_id);
        }
        removed
    }

    /// Drops every tenant. Returns how many were removed.
    pub fn invalidate_all(&self) -> usize {
        let removed = {
            let mut tenants = self.tenants.write();
            let count = tenants.len();
            tenants.clear();
            count
        };
        info!("Invalidated cache for all {} tenants", removed);
        removed
    }

    // == Scoped Accessors ==
    /// Read view of a tenant's analytics, creating the tenant if needed.
    pub fn analytics_reader(&self, tenant_id: &str) -> Result<Arc<dyn AnalyticsReader>> {
        let bundle = self.ensure_tenant(tenant_id)?;
        let reader: Arc<dyn AnalyticsReader> = bundle.analytics.clone();
        Ok(reader)
    }

    /// Write view of a tenant's analytics. The tenant must already exist.
    pub fn analytics_writer(&self, tenant_id: &str) -> Result<Arc<dyn AnalyticsWriter>> {
        let bundle = self.existing_tenant(tenant_id)?;
        let writer: Arc<dyn AnalyticsWriter> = bundle.analytics.clone();
        Ok(writer)
    }

    pub fn warming_lock(&self) -> &WarmingLock {
        &self.warming
    }

    // == Introspection ==
    /// Sorted tenant ids.
    pub fn tenant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tenants.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.read().len()
    }

    /// Stats for one tenant. Does not create or touch it.
    pub fn tenant_stats(&self, tenant_id: &str) -> Option<TenantStats> {
        let bundle = self.tenants.read().get(tenant_id).cloned()?;
        Some(bundle.stats())
    }

    pub fn stats(&self) -> ManagerStats {
        let bundles = self.snapshot();
        let mut total_entries = 0;
        let mut combined = CacheStats::default();
        for bundle in &bundles {
            let stats = bundle.stats();
            total_entries += stats.total_entries();
            combined = combined.merge(&stats.combined());
        }

        ManagerStats {
            tenant_count: bundles.len(),
            max_tenants: self.config.max_tenants,
            total_entries,
            max_estimated_entries: self.config.max_estimated_entries,
            tenant_evictions: self.tenant_evictions.load(Ordering::Relaxed),
            warming_in_progress: self.warming.len(),
            combined,
        }
    }

    /// Clones the bundle handles under a brief shared lock.
    fn snapshot(&self) -> Vec<Arc<TenantCacheBundle>> {
        self.tenants.read().values().cloned().collect()
    }

    // == Sweep ==
    /// Removes expired entries from every tenant and purges bins older
    /// than the retention window.
    ///
    /// The manager lock is held only while snapshotting, so a slow tenant
    /// never blocks requests to other tenants.
    pub fn sweep(&self) -> SweepReport {
        let bundles = self.snapshot();
        let cutoff = cutoff_hour_key(self.clock.now(), self.config.analytics_retention_hours);

        let mut report = SweepReport {
            cutoff_hour_key: cutoff,
            ..SweepReport::default()
        };
        for bundle in &bundles {
            let expired = bundle.cleanup_expired();
            let purged = report
                .cutoff_hour_key
                .as_deref()
                .map_or(0, |cutoff| bundle.analytics.purge_expired_bins(cutoff));
            if expired + purged > 0 {
                debug!(
                    "Swept tenant '{}': {} expired, {} bins purged",
                    bundle.tenant_id(),
                    expired,
                    purged
                );
            }
            report.tenants_swept += 1;
            report.expired_removed += expired;
            report.bins_purged += purged;
        }
        report
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::models::analytics::HourlySiteBin;
    use crate::models::state::SessionData;
    use chrono::{TimeZone, Utc};
    use std::thread;
    use std::time::Duration;

    fn manager_with(config: CacheConfig) -> (CacheManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        (CacheManager::with_clock(config, clock.clone()), clock)
    }

    fn manager() -> (CacheManager, Arc<ManualClock>) {
        manager_with(CacheConfig::default())
    }

    #[test]
    fn test_ensure_tenant_is_idempotent() {
        let (manager, _) = manager();
        let first = manager.ensure_tenant("acme").unwrap();
        let second = manager.ensure_tenant("acme").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.tenant_count(), 1);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let (manager, _) = manager();
        let acme = manager.ensure_tenant("acme").unwrap();
        let globex = manager.ensure_tenant("globex").unwrap();

        acme.user_state.set_known_fingerprint("fp-1", true);

        assert!(acme.user_state.is_known_fingerprint("fp-1"));
        assert!(!globex.user_state.is_known_fingerprint("fp-1"));
    }

    #[test]
    fn test_existing_tenant_requires_initialization() {
        let (manager, _) = manager();
        let result = manager.existing_tenant("ghost");
        assert!(matches!(result, Err(CacheError::TenantNotInitialized(id)) if id == "ghost"));
        assert!(!manager.has_tenant("ghost"));

        manager.ensure_tenant("ghost").unwrap();
        assert!(manager.existing_tenant("ghost").is_ok());
    }

    #[test]
    fn test_analytics_writer_requires_tenant() {
        let (manager, _) = manager();
        assert!(manager.analytics_writer("acme").is_err());

        let reader = manager.analytics_reader("acme").unwrap();
        let writer = manager.analytics_writer("acme").unwrap();
        writer.set_hourly_site_bin(
            "2024-03-01-10",
            HourlySiteBin {
                page_views: 9,
                ..HourlySiteBin::default()
            },
        );
        assert_eq!(reader.get_hourly_site_bin("2024-03-01-10").unwrap().page_views, 9);
    }

    #[test]
    fn test_evicts_least_recently_accessed_tenant() {
        let config = CacheConfig {
            max_tenants: 2,
            ..CacheConfig::default()
        };
        let (manager, clock) = manager_with(config);

        manager.ensure_tenant("a").unwrap();
        clock.advance(Duration::from_secs(1));
        manager.ensure_tenant("b").unwrap();
        clock.advance(Duration::from_secs(1));
        manager.ensure_tenant("a").unwrap();
        clock.advance(Duration::from_secs(1));
        manager.ensure_tenant("c").unwrap();

        assert_eq!(manager.tenant_ids(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(manager.stats().tenant_evictions, 1);
    }

    #[test]
    fn test_evicts_on_estimated_entries() {
        let config = CacheConfig {
            max_estimated_entries: 3,
            ..CacheConfig::default()
        };
        let (manager, clock) = manager_with(config);

        let big = manager.ensure_tenant("big").unwrap();
        for fp in ["fp-1", "fp-2", "fp-3"] {
            big.user_state.set_known_fingerprint(fp, true);
        }
        assert!(big.entry_count() >= 3);
        clock.advance(Duration::from_secs(1));

        manager.ensure_tenant("small").unwrap();
        assert_eq!(manager.tenant_ids(), vec!["small".to_string()]);
    }

    #[test]
    fn test_overcommit_creates_tenant_anyway() {
        let config = CacheConfig {
            max_tenants: 0,
            ..CacheConfig::default()
        };
        let (manager, _) = manager_with(config);

        assert!(manager.ensure_tenant("acme").is_ok());
        assert!(manager.has_tenant("acme"));
    }

    #[test]
    fn test_strict_policy_refuses_tenant() {
        let config = CacheConfig {
            max_tenants: 0,
            capacity_policy: CapacityPolicy::Strict,
            ..CacheConfig::default()
        };
        let (manager, _) = manager_with(config);

        let result = manager.ensure_tenant("acme");
        assert!(matches!(result, Err(CacheError::CapacityExceeded(_))));
        assert_eq!(manager.tenant_count(), 0);
    }

    #[test]
    fn test_invalidate_tenant_and_all() {
        let (manager, _) = manager();
        manager.ensure_tenant("a").unwrap();
        manager.ensure_tenant("b").unwrap();

        assert!(manager.invalidate_tenant("a"));
        assert!(!manager.invalidate_tenant("a"));
        assert_eq!(manager.tenant_ids(), vec!["b".to_string()]);

        assert_eq!(manager.invalidate_all(), 1);
        assert_eq!(manager.tenant_count(), 0);
    }

    #[test]
    fn test_tenant_stats_does_not_create() {
        let (manager, _) = manager();
        assert!(manager.tenant_stats("acme").is_none());
        assert!(!manager.has_tenant("acme"));

        manager.ensure_tenant("acme").unwrap();
        let stats = manager.tenant_stats("acme").unwrap();
        assert_eq!(stats.tenant_id, "acme");
        assert_eq!(stats.total_entries(), 0);
    }

    #[test]
    fn test_sweep_removes_expired_and_old_bins() {
        let (manager, clock) = manager();
        let acme = manager.ensure_tenant("acme").unwrap();
        let now = clock.now();
        acme.user_state.set_session(SessionData {
            session_id: "s-1".to_string(),
            fingerprint_id: "fp-1".to_string(),
            visit_id: "v-1".to_string(),
            lead_id: None,
            created_at: now,
            last_activity: now,
            expires_at: now + chrono::Duration::hours(1),
        });
        acme.analytics
            .set_hourly_site_bin("2024-01-01-00", HourlySiteBin::default());
        acme.analytics
            .set_hourly_site_bin("2024-03-01-11", HourlySiteBin::default());

        clock.advance(Duration::from_secs(2 * 3600));
        let report = manager.sweep();

        assert_eq!(report.tenants_swept, 1);
        assert_eq!(report.bins_purged, 1);
        assert!(report.expired_removed >= 1);
        assert_eq!(acme.user_state.session_count(), 0);
        assert_eq!(acme.analytics.site_bin_count(), 1);
    }

    #[test]
    fn test_sweep_with_unbounded_retention_keeps_bins() {
        let (manager, _) = manager_with(CacheConfig {
            analytics_retention_hours: u32::MAX,
            ..CacheConfig::default()
        });
        let acme = manager.ensure_tenant("acme").unwrap();
        acme.analytics
            .set_hourly_site_bin("2000-01-01-00", HourlySiteBin::default());

        let report = manager.sweep();

        assert_eq!(report.tenants_swept, 1);
        assert!(report.cutoff_hour_key.is_none());
        assert_eq!(report.bins_purged, 0);
        assert_eq!(acme.analytics.site_bin_count(), 1);
    }

    #[test]
    fn test_concurrent_ensure_tenant_creates_one_bundle() {
        let (manager, _) = manager();
        let manager = Arc::new(manager);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                thread::spawn(move || manager.ensure_tenant("acme").unwrap())
            })
            .collect();
        let bundles: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(manager.tenant_count(), 1);
        assert!(bundles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_warming_lock_is_shared() {
        let (manager, _) = manager();
        let guard = manager.warming_lock().try_acquire("acme:dashboard");
        assert!(guard.is_some());
        assert_eq!(manager.stats().warming_in_progress, 1);
        assert!(!manager.warming_lock().try_lock("acme:dashboard"));
        drop(guard);
        assert!(manager.warming_lock().is_empty());
    }
}
