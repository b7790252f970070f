//! Analytics Store Module
//!
//! Per-tenant hourly bins (per epinet, per content item, site-wide) and the
//! computed aggregates derived from them by the warming worker.
//!
//! Bins are keyed `entity_id:hour_key`, site bins by `hour_key` alone. Hour
//! keys are fixed width, so purging compares the hour component as a string.
//!
//! The store is handed out through two narrowed views: [`AnalyticsReader`]
//! for request serving and [`AnalyticsWriter`] for the warming worker.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::cache::clock::{is_stale, Clock};
use crate::cache::stats::{CacheCounters, CacheStats};
use crate::models::analytics::{
    is_current_hour, DashboardData, HourlyContentBin, HourlyEpinetBin, HourlySiteBin, LeadMetrics,
};

fn bin_key(entity_id: &str, hour_key: &str) -> String {
    format!("{}:{}", entity_id, hour_key)
}

/// Hour component of an entity bin key.
fn hour_of(key: &str) -> &str {
    key.rsplit_once(':').map_or(key, |(_, hour)| hour)
}

// == Bin Range ==
/// Result of a range lookup: found bins by hour key, plus the hours still
/// to compute. Every requested hour lands in exactly one of the two.
#[derive(Debug, Clone, PartialEq)]
pub struct BinRange<T> {
    pub found: HashMap<String, T>,
    pub missing: Vec<String>,
}

impl<T> BinRange<T> {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Stamped<T> {
    value: T,
    computed_at: DateTime<Utc>,
    ttl: Duration,
}

impl<T: Clone> Stamped<T> {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        is_stale(self.computed_at, self.ttl, now)
    }

    fn live(&self, now: DateTime<Utc>) -> Option<T> {
        if self.expired(now) {
            None
        } else {
            Some(self.value.clone())
        }
    }
}

#[derive(Debug, Default)]
struct AnalyticsInner {
    epinet_bins: HashMap<String, Stamped<HourlyEpinetBin>>,
    content_bins: HashMap<String, Stamped<HourlyContentBin>>,
    site_bins: HashMap<String, Stamped<HourlySiteBin>>,
    lead_metrics: Option<Stamped<LeadMetrics>>,
    dashboard: Option<Stamped<DashboardData>>,
    last_full_hour: Option<String>,
}

impl AnalyticsInner {
    fn len(&self) -> usize {
        self.epinet_bins.len()
            + self.content_bins.len()
            + self.site_bins.len()
            + usize::from(self.lead_metrics.is_some())
            + usize::from(self.dashboard.is_some())
    }
}

fn range_of<T: Clone>(
    bins: &HashMap<String, Stamped<T>>,
    hour_keys: &[String],
    key_for: impl Fn(&str) -> String,
    now: DateTime<Utc>,
    counters: &CacheCounters,
) -> BinRange<T> {
    let mut found = HashMap::new();
    let mut missing = Vec::new();
    let mut seen = HashSet::new();

    for hour in hour_keys {
        if !seen.insert(hour.as_str()) {
            continue;
        }
        match bins.get(&key_for(hour)).and_then(|bin| bin.live(now)) {
            Some(bin) => {
                counters.record_hit();
                found.insert(hour.clone(), bin);
            }
            None => {
                counters.record_miss();
                missing.push(hour.clone());
            }
        }
    }
    BinRange { found, missing }
}

// == Analytics Store ==
/// One tenant's analytics bins and aggregates.
#[derive(Debug)]
pub struct AnalyticsStore {
    inner: RwLock<AnalyticsInner>,
    current_hour_ttl: Duration,
    closed_hour_ttl: Duration,
    aggregate_ttl: Duration,
    clock: Arc<dyn Clock>,
    counters: CacheCounters,
}

impl AnalyticsStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `current_hour_ttl` - TTL of bins for the hour still in progress
    /// * `closed_hour_ttl` - TTL of bins for hours that have fully elapsed
    /// * `aggregate_ttl` - TTL of lead metrics and dashboard data
    /// * `clock` - Time source
    pub fn new(
        current_hour_ttl: Duration,
        closed_hour_ttl: Duration,
        aggregate_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: RwLock::new(AnalyticsInner::default()),
            current_hour_ttl,
            closed_hour_ttl,
            aggregate_ttl,
            clock,
            counters: CacheCounters::new(),
        }
    }

    fn stamp<T>(&self, hour_key: &str, value: T) -> Stamped<T> {
        let now = self.clock.now();
        let ttl = if is_current_hour(hour_key, now) {
            self.current_hour_ttl
        } else {
            self.closed_hour_ttl
        };
        Stamped {
            value,
            computed_at: now,
            ttl,
        }
    }

    // == Epinet Bins ==
    pub fn get_hourly_epinet_bin(&self, epinet_id: &str, hour_key: &str) -> Option<HourlyEpinetBin> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .epinet_bins
            .get(&bin_key(epinet_id, hour_key))
            .and_then(|bin| bin.live(now));
        self.counters.record(found)
    }

    pub fn set_hourly_epinet_bin(&self, epinet_id: &str, hour_key: &str, bin: HourlyEpinetBin) {
        let stamped = self.stamp(hour_key, bin);
        self.inner
            .write()
            .epinet_bins
            .insert(bin_key(epinet_id, hour_key), stamped);
    }

    /// Partitions `hour_keys` into cached bins and hours still to compute,
    /// under a single read lock.
    pub fn get_hourly_epinet_range(
        &self,
        epinet_id: &str,
        hour_keys: &[String],
    ) -> BinRange<HourlyEpinetBin> {
        let now = self.clock.now();
        let inner = self.inner.read();
        range_of(
            &inner.epinet_bins,
            hour_keys,
            |hour| bin_key(epinet_id, hour),
            now,
            &self.counters,
        )
    }

    // == Content Bins ==
    pub fn get_hourly_content_bin(&self, content_id: &str, hour_key: &str) -> Option<HourlyContentBin> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .content_bins
            .get(&bin_key(content_id, hour_key))
            .and_then(|bin| bin.live(now));
        self.counters.record(found)
    }

    pub fn set_hourly_content_bin(&self, content_id: &str, hour_key: &str, bin: HourlyContentBin) {
        let stamped = self.stamp(hour_key, bin);
        self.inner
            .write()
            .content_bins
            .insert(bin_key(content_id, hour_key), stamped);
    }

    pub fn get_hourly_content_range(
        &self,
        content_id: &str,
        hour_keys: &[String],
    ) -> BinRange<HourlyContentBin> {
        let now = self.clock.now();
        let inner = self.inner.read();
        range_of(
            &inner.content_bins,
            hour_keys,
            |hour| bin_key(content_id, hour),
            now,
            &self.counters,
        )
    }

    // == Site Bins ==
    pub fn get_hourly_site_bin(&self, hour_key: &str) -> Option<HourlySiteBin> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .site_bins
            .get(hour_key)
            .and_then(|bin| bin.live(now));
        self.counters.record(found)
    }

    pub fn set_hourly_site_bin(&self, hour_key: &str, bin: HourlySiteBin) {
        let stamped = self.stamp(hour_key, bin);
        self.inner
            .write()
            .site_bins
            .insert(hour_key.to_string(), stamped);
    }

    pub fn get_hourly_site_range(&self, hour_keys: &[String]) -> BinRange<HourlySiteBin> {
        let now = self.clock.now();
        let inner = self.inner.read();
        range_of(
            &inner.site_bins,
            hour_keys,
            |hour| hour.to_string(),
            now,
            &self.counters,
        )
    }

    // == Purge ==
    /// Deletes every bin whose hour key sorts before `cutoff_hour_key`.
    /// Returns the number of bins removed.
    pub fn purge_expired_bins(&self, cutoff_hour_key: &str) -> usize {
        let mut inner = self.inner.write();
        let before = inner.epinet_bins.len() + inner.content_bins.len() + inner.site_bins.len();

        inner.epinet_bins.retain(|key, _| hour_of(key) >= cutoff_hour_key);
        inner.content_bins.retain(|key, _| hour_of(key) >= cutoff_hour_key);
        inner.site_bins.retain(|hour, _| hour.as_str() >= cutoff_hour_key);

        let removed =
            before - (inner.epinet_bins.len() + inner.content_bins.len() + inner.site_bins.len());
        if removed > 0 {
            debug!("Purged {} bins older than {}", removed, cutoff_hour_key);
        }
        removed
    }

    // == Computed Aggregates ==
    /// Lead metrics, or `None` when never computed or past their TTL.
    pub fn get_lead_metrics(&self) -> Option<LeadMetrics> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .lead_metrics
            .as_ref()
            .and_then(|cached| cached.live(now));
        self.counters.record(found)
    }

    pub fn set_lead_metrics(&self, metrics: LeadMetrics) {
        let stamped = Stamped {
            value: metrics,
            computed_at: self.clock.now(),
            ttl: self.aggregate_ttl,
        };
        self.inner.write().lead_metrics = Some(stamped);
    }

    /// Dashboard data, or `None` when never computed or past its TTL.
    pub fn get_dashboard_data(&self) -> Option<DashboardData> {
        let now = self.clock.now();
        let found = self
            .inner
            .read()
            .dashboard
            .as_ref()
            .and_then(|cached| cached.live(now));
        self.counters.record(found)
    }

    pub fn set_dashboard_data(&self, data: DashboardData) {
        let stamped = Stamped {
            value: data,
            computed_at: self.clock.now(),
            ttl: self.aggregate_ttl,
        };
        self.inner.write().dashboard = Some(stamped);
    }

    /// Drops both aggregates so the next read forces recomputation.
    pub fn invalidate_aggregates(&self) {
        let mut inner = self.inner.write();
        inner.lead_metrics = None;
        inner.dashboard = None;
    }

    /// Newest hour the warming worker has fully binned.
    pub fn get_last_full_hour(&self) -> Option<String> {
        self.inner.read().last_full_hour.clone()
    }

    pub fn set_last_full_hour(&self, hour_key: &str) {
        self.inner.write().last_full_hour = Some(hour_key.to_string());
    }

    // == Maintenance ==
    /// Physically drops TTL-expired bins and aggregates. Returns the count.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.write();
        let before = inner.len();

        inner.epinet_bins.retain(|_, bin| !bin.expired(now));
        inner.content_bins.retain(|_, bin| !bin.expired(now));
        inner.site_bins.retain(|_, bin| !bin.expired(now));
        if inner.lead_metrics.as_ref().is_some_and(|m| m.expired(now)) {
            inner.lead_metrics = None;
        }
        if inner.dashboard.as_ref().is_some_and(|d| d.expired(now)) {
            inner.dashboard = None;
        }

        before - inner.len()
    }

    pub fn invalidate_all(&self) {
        *self.inner.write() = AnalyticsInner::default();
    }

    pub fn epinet_bin_count(&self) -> usize {
        self.inner.read().epinet_bins.len()
    }

    pub fn content_bin_count(&self) -> usize {
        self.inner.read().content_bins.len()
    }

    pub fn site_bin_count(&self) -> usize {
        self.inner.read().site_bins.len()
    }

    /// True when a non-expired aggregate of each kind is present.
    pub fn has_aggregates(&self) -> (bool, bool) {
        let now = self.clock.now();
        let inner = self.inner.read();
        (
            inner.lead_metrics.as_ref().is_some_and(|m| !m.expired(now)),
            inner.dashboard.as_ref().is_some_and(|d| !d.expired(now)),
        )
    }

    /// Bins and aggregates physically held, stale or not.
    pub fn entry_count(&self) -> usize {
        self.inner.read().len()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

// == Role Views ==
/// Read side of the analytics store, for request-serving code.
pub trait AnalyticsReader: Send + Sync {
    fn get_hourly_epinet_bin(&self, epinet_id: &str, hour_key: &str) -> Option<HourlyEpinetBin>;
    fn get_hourly_epinet_range(&self, epinet_id: &str, hour_keys: &[String]) -> BinRange<HourlyEpinetBin>;
    fn get_hourly_content_bin(&self, content_id: &str, hour_key: &str) -> Option<HourlyContentBin>;
    fn get_hourly_content_range(&self, content_id: &str, hour_keys: &[String]) -> BinRange<HourlyContentBin>;
    fn get_hourly_site_bin(&self, hour_key: &str) -> Option<HourlySiteBin>;
    fn get_hourly_site_range(&self, hour_keys: &[String]) -> BinRange<HourlySiteBin>;
    fn get_lead_metrics(&self) -> Option<LeadMetrics>;
    fn get_dashboard_data(&self) -> Option<DashboardData>;
    fn get_last_full_hour(&self) -> Option<String>;
}

/// Write side of the analytics store, for the warming worker.
pub trait AnalyticsWriter: Send + Sync {
    fn set_hourly_epinet_bin(&self, epinet_id: &str, hour_key: &str, bin: HourlyEpinetBin);
    fn set_hourly_content_bin(&self, content_id: &str, hour_key: &str, bin: HourlyContentBin);
    fn set_hourly_site_bin(&self, hour_key: &str, bin: HourlySiteBin);
    fn set_lead_metrics(&self, metrics: LeadMetrics);
    fn set_dashboard_data(&self, data: DashboardData);
    fn set_last_full_hour(&self, hour_key: &str);
    fn purge_expired_bins(&self, cutoff_hour_key: &str) -> usize;
}

impl AnalyticsReader for AnalyticsStore {
    fn get_hourly_epinet_bin(&self, epinet_id: &str, hour_key: &str) -> Option<HourlyEpinetBin> {
        AnalyticsStore::get_hourly_epinet_bin(self, epinet_id, hour_key)
    }

    fn get_hourly_epinet_range(&self, epinet_id: &str, hour_keys: &[String]) -> BinRange<HourlyEpinetBin> {
        AnalyticsStore::get_hourly_epinet_range(self, epinet_id, hour_keys)
    }

    fn get_hourly_content_bin(&self, content_id: &str, hour_key: &str) -> Option<HourlyContentBin> {
        AnalyticsStore::get_hourly_content_bin(self, content_id, hour_key)
    }

    fn get_hourly_content_range(&self, content_id: &str, hour_keys: &[String]) -> BinRange<HourlyContentBin> {
        AnalyticsStore::get_hourly_content_range(self, content_id, hour_keys)
    }

    fn get_hourly_site_bin(&self, hour_key: &str) -> Option<HourlySiteBin> {
        AnalyticsStore::get_hourly_site_bin(self, hour_key)
    }

    fn get_hourly_site_range(&self, hour_keys: &[String]) -> BinRange<HourlySiteBin> {
        AnalyticsStore::get_hourly_site_range(self, hour_keys)
    }

    fn get_lead_metrics(&self) -> Option<LeadMetrics> {
        AnalyticsStore::get_lead_metrics(self)
    }

    fn get_dashboard_data(&self) -> Option<DashboardData> {
        AnalyticsStore::get_dashboard_data(self)
    }

    fn get_last_full_hour(&self) -> Option<String> {
        AnalyticsStore::get_last_full_hour(self)
    }
}

impl AnalyticsWriter for AnalyticsStore {
    fn set_hourly_epinet_bin(&self, epinet_id: &str, hour_key: &str, bin: HourlyEpinetBin) {
        AnalyticsStore::set_hourly_epinet_bin(self, epinet_id, hour_key, bin)
    }

    fn set_hourly_content_bin(&self, content_id: &str, hour_key: &str, bin: HourlyContentBin) {
        AnalyticsStore::set_hourly_content_bin(self, content_id, hour_key, bin)
    }

    fn set_hourly_site_bin(&self, hour_key: &str, bin: HourlySiteBin) {
        AnalyticsStore::set_hourly_site_bin(self, hour_key, bin)
    }

    fn set_lead_metrics(&self, metrics: LeadMetrics) {
        AnalyticsStore::set_lead_metrics(self, metrics)
    }

    fn set_dashboard_data(&self, data: DashboardData) {
        AnalyticsStore::set_dashboard_data(self, data)
    }

    fn set_last_full_hour(&self, hour_key: &str) {
        AnalyticsStore::set_last_full_hour(self, hour_key)
    }

    fn purge_expired_bins(&self, cutoff_hour_key: &str) -> usize {
        AnalyticsStore::purge_expired_bins(self, cutoff_hour_key)
    }
}
