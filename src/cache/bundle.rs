//! Tenant Bundle Module
//!
//! The four per-tenant stores, built together by one constructor so a
//! tenant is either fully present or absent.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::analytics::AnalyticsStore;
use crate::cache::clock::Clock;
use crate::cache::content::ContentStore;
use crate::cache::html::HtmlChunkStore;
use crate::cache::stats::CacheStats;
use crate::cache::user_state::UserStateStore;
use crate::config::CacheConfig;

/// Per-store entry counts and counters for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantStats {
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub content_entries: usize,
    pub user_state_entries: usize,
    pub html_entries: usize,
    pub analytics_entries: usize,
    pub session_count: usize,
    pub content: CacheStats,
    pub user_state: CacheStats,
    pub html: CacheStats,
    pub analytics: CacheStats,
}

impl TenantStats {
    pub fn total_entries(&self) -> usize {
        self.content_entries + self.user_state_entries + self.html_entries + self.analytics_entries
    }

    /// Counters of all four stores summed.
    pub fn combined(&self) -> CacheStats {
        self.content
            .merge(&self.user_state)
            .merge(&self.html)
            .merge(&self.analytics)
    }
}

// == Tenant Cache Bundle ==
/// All cache state for one tenant.
#[derive(Debug)]
pub struct TenantCacheBundle {
    tenant_id: String,
    pub content: ContentStore,
    pub user_state: UserStateStore,
    pub html: HtmlChunkStore,
    /// Shared so it can be handed out behind the role views.
    pub analytics: Arc<AnalyticsStore>,
    created_at: DateTime<Utc>,
    /// Unix millis of the last manager-level access
    last_accessed: AtomicI64,
    clock: Arc<dyn Clock>,
}

impl TenantCacheBundle {
    /// Builds all four stores for `tenant_id` from the cache limits.
    pub fn new(tenant_id: impl Into<String>, config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            tenant_id: tenant_id.into(),
            content: ContentStore::new(config.content_ttl, clock.clone()),
            user_state: UserStateStore::new(
                config.user_state_ttl,
                config.session_ttl,
                config.max_sessions_per_tenant,
                clock.clone(),
            ),
            html: HtmlChunkStore::new(config.html_ttl, clock.clone()),
            analytics: Arc::new(AnalyticsStore::new(
                config.current_hour_bin_ttl,
                config.closed_hour_bin_ttl,
                config.aggregate_ttl,
                clock.clone(),
            )),
            created_at: now,
            last_accessed: AtomicI64::new(now.timestamp_millis()),
            clock,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Records an access for least-recently-accessed eviction.
    pub fn touch(&self) {
        self.last_accessed
            .store(self.clock.now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_accessed_millis(&self) -> i64 {
        self.last_accessed.load(Ordering::Relaxed)
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_accessed_millis()).unwrap_or(self.created_at)
    }

    /// Entries physically held across all four stores, used as the
    /// memory estimate.
    pub fn entry_count(&self) -> usize {
        self.content.entry_count()
            + self.user_state.entry_count()
            + self.html.entry_count()
            + self.analytics.entry_count()
    }

    /// Expiry sweep of every store. Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        self.content.cleanup_expired()
            + self.user_state.cleanup_expired()
            + self.html.cleanup_expired()
            + self.analytics.cleanup_expired()
    }

    pub fn stats(&self) -> TenantStats {
        TenantStats {
            tenant_id: self.tenant_id.clone(),
            created_at: self.created_at,
            last_accessed: self.last_accessed(),
            content_entries: self.content.entry_count(),
            user_state_entries: self.user_state.entry_count(),
            html_entries: self.html.entry_count(),
            analytics_entries: self.analytics.entry_count(),
            session_count: self.user_state.session_count(),
            content: self.content.stats(),
            user_state: self.user_state.stats(),
            html: self.html.stats(),
            analytics: self.analytics.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::models::content::StoryFragment;
    use crate::models::html::FragmentKey;
    use chrono::TimeZone;
    use std::time::Duration;

    fn bundle() -> (TenantCacheBundle, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let bundle = TenantCacheBundle::new("acme", &CacheConfig::default(), clock.clone());
        (bundle, clock)
    }

    #[test]
    fn test_new_bundle_is_empty() {
        let (bundle, _) = bundle();
        assert_eq!(bundle.tenant_id(), "acme");
        assert_eq!(bundle.entry_count(), 0);
        assert_eq!(bundle.stats().total_entries(), 0);
    }

    #[test]
    fn test_entry_count_spans_stores() {
        let (bundle, _) = bundle();
        bundle.content.set(StoryFragment {
            id: "sf-1".to_string(),
            title: "Home".to_string(),
            slug: "home".to_string(),
            container_id: "tc-1".to_string(),
            pane_ids: vec![],
            menu_id: None,
            changed: None,
        });
        bundle.html.set_html_chunk(
            &FragmentKey::default_for("sf-1"),
            "<div/>".to_string(),
            vec!["sf-1".to_string()],
        );
        bundle.analytics.set_hourly_site_bin("2024-03-01-11", Default::default());

        let stats = bundle.stats();
        assert_eq!(stats.content_entries, bundle.content.entry_count());
        assert_eq!(bundle.html.chunk_count(), 1);
        assert_eq!(stats.html_entries, bundle.html.entry_count());
        assert_eq!(stats.analytics_entries, 1);
        assert_eq!(bundle.entry_count(), stats.total_entries());
    }

    #[test]
    fn test_touch_moves_last_accessed() {
        let (bundle, clock) = bundle();
        let before = bundle.last_accessed_millis();
        clock.advance(Duration::from_secs(10));
        bundle.touch();
        assert_eq!(bundle.last_accessed_millis(), before + 10_000);
        assert_eq!(bundle.last_accessed(), clock.now());
    }
}
